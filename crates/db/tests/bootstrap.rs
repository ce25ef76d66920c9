use sqlx::PgPool;

/// Connect, migrate, and verify every lookup table carries seed data.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    backoffice_db::health_check(&pool).await.unwrap();

    let tables = [
        "roles",
        "subdomain_statuses",
        "plan_visibilities",
        "payment_statuses",
        "order_statuses",
        "attendance_statuses",
        "finalization_statuses",
        "attendance_types",
        "score_session_statuses",
        "survey_statuses",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert!(count.0 > 0, "{table} should have seed data, got 0 rows");
    }
}

/// Role names resolve to the ids the application relies on.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_roles_seeded(pool: PgPool) {
    for role in backoffice_core::roles::ALL_ROLES {
        let id = backoffice_db::repositories::UserRepo::role_id_by_name(&pool, role)
            .await
            .unwrap();
        assert!(id.is_some(), "role {role} should be seeded");
    }
}

/// A single active score configuration (10/20/30/40) ships with the schema.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_default_score_configuration(pool: PgPool) {
    let config = backoffice_db::repositories::ScoreRepo::active_configuration(&pool)
        .await
        .unwrap()
        .expect("default configuration");
    let weights = config.weights();
    assert_eq!(weights.total(), 100.0);
    assert_eq!(weights.attendance, 10.0);
    assert_eq!(weights.final_exam, 40.0);
}
