//! Subscription expiry sweep.
//!
//! Each tick renews or deactivates ended subscriptions, warns about ones
//! ending soon, then brings subdomain statuses in line with the result.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::services::SubscriptionService;

pub async fn run(
    service: SubscriptionService,
    interval_secs: u64,
    warning_days: i64,
    cancel: CancellationToken,
) {
    let period = Duration::from_secs(interval_secs.max(1));
    tracing::info!(
        interval_secs = period.as_secs(),
        warning_days,
        "Subscription sweep job started"
    );

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Subscription sweep job stopping");
                break;
            }
            _ = interval.tick() => sweep_once(&service, warning_days).await,
        }
    }
}

/// One pass of the sweep. Each stage logs and swallows its own failure so a
/// broken stage does not block the others.
pub async fn sweep_once(service: &SubscriptionService, warning_days: i64) {
    match service.process_expired(None).await {
        Ok(summary) if summary.total_expired == 0 => {
            tracing::debug!("Subscription sweep: nothing expired");
        }
        Ok(summary) => tracing::info!(
            total_expired = summary.total_expired,
            renewed = summary.renewed,
            deactivated = summary.deactivated,
            errors = summary.errors,
            "Subscription sweep: processed expired subscriptions"
        ),
        Err(e) => tracing::error!(error = %e, "Subscription sweep: expiry processing failed"),
    }

    match service.send_expiry_warnings(warning_days).await {
        Ok(0) => {}
        Ok(sent) => tracing::info!(sent, "Subscription sweep: expiry warnings published"),
        Err(e) => tracing::error!(error = %e, "Subscription sweep: expiry warnings failed"),
    }

    match service.sync_subdomains().await {
        Ok(0) => {}
        Ok(changed) => tracing::info!(changed, "Subscription sweep: subdomain statuses updated"),
        Err(e) => tracing::error!(error = %e, "Subscription sweep: subdomain sync failed"),
    }
}
