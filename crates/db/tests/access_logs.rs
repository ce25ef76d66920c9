//! Access log writes, lookups and retention.

use backoffice_db::models::access_log::CreateAccessLog;
use backoffice_db::repositories::AccessLogRepo;
use chrono::{Duration, Utc};
use sqlx::PgPool;

fn entry(user_id: Option<i64>, endpoint: &str, status_code: i32) -> CreateAccessLog {
    CreateAccessLog {
        user_id,
        user_role: user_id.map(|_| "admin".to_string()),
        http_method: "GET".to_string(),
        endpoint: endpoint.to_string(),
        query_string: None,
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: None,
        request_id: None,
        status_code,
        response_time_ms: 12,
        error_message: (status_code >= 400).then(|| format!("HTTP {status_code} error")),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_recent_filters_by_user(pool: PgPool) {
    AccessLogRepo::insert(&pool, &entry(None, "/api/v1/plans", 200)).await.unwrap();
    AccessLogRepo::insert(&pool, &entry(Some(5), "/api/v1/orders", 404)).await.unwrap();

    let all = AccessLogRepo::recent(&pool, None, 10).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].endpoint, "/api/v1/orders");

    let mine = AccessLogRepo::recent(&pool, Some(5), 10).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status_code, 404);
    assert_eq!(mine[0].error_message.as_deref(), Some("HTTP 404 error"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_retention_deletes_only_old_entries(pool: PgPool) {
    AccessLogRepo::insert(&pool, &entry(None, "/api/v1/plans", 200)).await.unwrap();
    AccessLogRepo::insert(&pool, &entry(None, "/api/v1/plans", 200)).await.unwrap();
    sqlx::query(
        "UPDATE access_logs SET created_at = NOW() - INTERVAL '100 days'
         WHERE id = (SELECT MIN(id) FROM access_logs)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let cutoff = Utc::now() - Duration::days(90);
    assert_eq!(AccessLogRepo::delete_older_than(&pool, cutoff).await.unwrap(), 1);
    assert_eq!(AccessLogRepo::recent(&pool, None, 10).await.unwrap().len(), 1);
}
