//! Daily purge of access log entries past the retention window.

use std::time::Duration;

use backoffice_db::repositories::AccessLogRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 3600);

pub async fn run(pool: PgPool, retention_days: i64, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        retention_days,
        "Access log cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Access log cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                purge_once(&pool, retention_days).await;
            }
        }
    }
}

/// Delete entries older than `retention_days`. Returns how many went.
pub async fn purge_once(pool: &PgPool, retention_days: i64) -> u64 {
    let Some(cutoff) = chrono::Duration::try_days(retention_days.max(1))
        .and_then(|keep| chrono::Utc::now().checked_sub_signed(keep))
    else {
        tracing::warn!(retention_days, "Access log retention out of range, skipping purge");
        return 0;
    };
    match AccessLogRepo::delete_older_than(pool, cutoff).await {
        Ok(0) => {
            tracing::debug!("Access log cleanup: nothing to purge");
            0
        }
        Ok(deleted) => {
            tracing::info!(deleted, "Access log cleanup: purged entries");
            deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "Access log cleanup failed");
            0
        }
    }
}
