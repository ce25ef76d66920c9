//! Cart housekeeping.
//!
//! Hourly: lines pointing at deleted or unavailable products.
//! Daily: lines nobody has touched for [`STALE_AFTER_DAYS`] days.

use std::time::Duration;

use backoffice_db::repositories::CartRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

const UNORDERABLE_INTERVAL: Duration = Duration::from_secs(3600);
const STALE_INTERVAL: Duration = Duration::from_secs(24 * 3600);

pub const STALE_AFTER_DAYS: i64 = 7;

pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        unorderable_interval_secs = UNORDERABLE_INTERVAL.as_secs(),
        stale_interval_secs = STALE_INTERVAL.as_secs(),
        "Cart cleanup job started"
    );

    let mut unorderable = tokio::time::interval(UNORDERABLE_INTERVAL);
    let mut stale = tokio::time::interval(STALE_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Cart cleanup job stopping");
                break;
            }
            _ = unorderable.tick() => {
                purge_unorderable(&pool).await;
            }
            _ = stale.tick() => {
                purge_stale(&pool).await;
            }
        }
    }
}

pub async fn purge_unorderable(pool: &PgPool) -> u64 {
    match CartRepo::purge_unorderable_lines(pool).await {
        Ok(0) => {
            tracing::debug!("Cart cleanup: no unorderable lines");
            0
        }
        Ok(deleted) => {
            tracing::info!(deleted, "Cart cleanup: removed lines for unavailable products");
            deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "Cart cleanup of unavailable products failed");
            0
        }
    }
}

pub async fn purge_stale(pool: &PgPool) -> u64 {
    let cutoff = chrono::Utc::now() - chrono::Duration::days(STALE_AFTER_DAYS);
    match CartRepo::purge_stale_lines(pool, cutoff).await {
        Ok(0) => {
            tracing::debug!("Cart cleanup: no stale lines");
            0
        }
        Ok(deleted) => {
            tracing::info!(
                deleted,
                stale_after_days = STALE_AFTER_DAYS,
                "Cart cleanup: removed stale lines"
            );
            deleted
        }
        Err(e) => {
            tracing::error!(error = %e, "Cart cleanup of stale lines failed");
            0
        }
    }
}
