use backoffice_db::models::session::CreateSession;
use backoffice_db::models::user::CreateUser;
use backoffice_db::repositories::{SessionRepo, UserRepo};
use chrono::{Duration, Utc};
use sqlx::PgPool;

async fn seed_user(pool: &PgPool) -> i64 {
    let role_id = UserRepo::role_id_by_name(pool, "customer").await.unwrap().unwrap();
    UserRepo::create(
        pool,
        &CreateUser {
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password_hash: "hash".to_string(),
            role_id,
            full_name: None,
            phone: None,
            business_id: None,
            class_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn session(user_id: i64, hash: &str) -> CreateSession {
    CreateSession {
        user_id,
        refresh_token_hash: hash.to_string(),
        expires_at: Utc::now() + Duration::days(7),
        user_agent: None,
        ip_address: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rotate_consumes_old_token(pool: PgPool) {
    let user_id = seed_user(&pool).await;
    SessionRepo::create(&pool, &session(user_id, "old")).await.unwrap();

    let rotated = SessionRepo::rotate(&pool, "old", &session(user_id, "new"))
        .await
        .unwrap();
    assert!(rotated.is_some());
    assert!(SessionRepo::find_active(&pool, "old").await.unwrap().is_none());
    assert!(SessionRepo::find_active(&pool, "new").await.unwrap().is_some());

    // Replaying the consumed token mints nothing.
    let replay = SessionRepo::rotate(&pool, "old", &session(user_id, "newer"))
        .await
        .unwrap();
    assert!(replay.is_none());
    assert!(SessionRepo::find_active(&pool, "newer").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_revoke_all_then_purge(pool: PgPool) {
    let user_id = seed_user(&pool).await;
    SessionRepo::create(&pool, &session(user_id, "a")).await.unwrap();
    SessionRepo::create(&pool, &session(user_id, "b")).await.unwrap();

    let revoked = SessionRepo::revoke_for_user(&pool, user_id, None).await.unwrap();
    assert_eq!(revoked, 2);
    assert_eq!(SessionRepo::purge_dead(&pool).await.unwrap(), 2);
}
