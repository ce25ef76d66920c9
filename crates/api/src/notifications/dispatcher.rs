//! Event-to-notification delivery.
//!
//! [`NotificationDispatcher`] subscribes to the event bus. For each event
//! about a business it writes a system message thread and, when the business
//! has a linked and unmuted Telegram chat, pushes the same text there.

use std::sync::Arc;

use backoffice_core::telegram::render_notification;
use backoffice_db::models::message::CreateThread;
use backoffice_db::repositories::{BusinessRepo, MessageRepo, TelegramRepo};
use backoffice_db::DbPool;
use backoffice_events::{event_types, MessageSender, PlatformEvent};
use tokio::sync::broadcast;

/// Text derived from one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: &'static str,
    pub body: String,
    /// Whether the notice is also kept as a system thread in the inbox.
    pub keep_in_inbox: bool,
}

/// Build the notice for an event, or `None` when nobody is told about it.
pub fn notice_for(event: &PlatformEvent) -> Option<Notice> {
    let plan = event.payload_str("plan_name").unwrap_or("your plan");
    let end = event
        .payload_str("end_date")
        .map(short_date)
        .unwrap_or_else(|| "unknown".to_string());
    let reason = event.payload_str("reason").unwrap_or("no reason given");

    let (subject, body, keep_in_inbox) = match event.event_type.as_str() {
        event_types::BUSINESS_CREATED => (
            "Welcome",
            format!(
                "Welcome aboard, {}! Your e-menu is ready to be configured.",
                event.payload_str("business_name").unwrap_or("there")
            ),
            true,
        ),
        event_types::SUBSCRIPTION_RENEWED => (
            "Subscription Renewed",
            format!("Your subscription to {plan} was renewed and now runs until {end}."),
            true,
        ),
        event_types::SUBSCRIPTION_CANCELLED => (
            "Subscription Cancelled",
            format!("Your subscription to {plan} was cancelled. Access ends on {end}."),
            true,
        ),
        event_types::SUBSCRIPTION_SUSPENDED => (
            "Subscription Suspended",
            format!("Your subscription to {plan} was suspended: {reason}."),
            true,
        ),
        event_types::SUBSCRIPTION_EXPIRED => (
            "Subscription Expired",
            format!("Your subscription to {plan} expired on {end}. Renew to keep your menu online."),
            true,
        ),
        event_types::SUBSCRIPTION_EXPIRING => (
            "Subscription Expiring Soon",
            format!(
                "Your subscription to {plan} ends on {end} ({} days left).",
                event
                    .payload
                    .get("days_remaining")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0)
            ),
            true,
        ),
        event_types::SUBSCRIPTION_EXTENDED => (
            "Subscription Extended",
            format!(
                "Your subscription to {plan} was extended by {} days and now ends on {end}.",
                event.payload.get("days").and_then(|v| v.as_i64()).unwrap_or(0)
            ),
            true,
        ),
        event_types::ORDER_PLACED => (
            "New Order",
            format!(
                "Order {} was placed, total {}.",
                event.payload_str("order_number").unwrap_or("?"),
                money(event.payload.get("total_cents").and_then(|v| v.as_i64()).unwrap_or(0))
            ),
            false,
        ),
        _ => return None,
    };

    Some(Notice {
        subject,
        body,
        keep_in_inbox,
    })
}

/// `2026-10-19T08:00:00Z` becomes `2026-10-19`.
fn short_date(rfc3339: &str) -> String {
    rfc3339.split('T').next().unwrap_or(rfc3339).to_string()
}

fn money(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

pub struct NotificationDispatcher {
    pool: DbPool,
    sender: Arc<dyn MessageSender>,
}

impl NotificationDispatcher {
    pub fn new(pool: DbPool, sender: Arc<dyn MessageSender>) -> Self {
        Self { pool, sender }
    }

    /// Consume events until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.dispatch(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to dispatch notification"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification dispatcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher shutting down");
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, event: &PlatformEvent) -> Result<(), sqlx::Error> {
        let Some(business_id) = event.business_id else {
            return Ok(());
        };
        let Some(notice) = notice_for(event) else {
            return Ok(());
        };
        let Some(business) = BusinessRepo::find_by_id(&self.pool, business_id).await? else {
            tracing::debug!(business_id, "Business gone, notification skipped");
            return Ok(());
        };

        if notice.keep_in_inbox {
            let thread = MessageRepo::create_thread(
                &self.pool,
                &CreateThread {
                    business_id,
                    subject: notice.subject.to_string(),
                    is_system: true,
                    created_by: None,
                    content: notice.body.clone(),
                },
            )
            .await?;
            tracing::debug!(business_id, thread_id = thread.id, subject = notice.subject, "System thread created");
        }

        if let Some(chat_id) = business.telegram_chat_id {
            if !self.sender.is_enabled() || TelegramRepo::chat_muted(&self.pool, chat_id).await? {
                return Ok(());
            }
            let text = render_notification(notice.subject, &notice.body);
            if let Err(e) = self.sender.send_text(chat_id, &text).await {
                tracing::warn!(business_id, chat_id, error = %e, "Telegram notification not delivered");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lifecycle_events_get_inbox_subjects() {
        let event = PlatformEvent::subscription(event_types::SUBSCRIPTION_RENEWED, 1, 2)
            .with_payload(json!({ "plan_name": "Monthly", "end_date": "2026-11-18T10:00:00Z" }));
        let notice = notice_for(&event).unwrap();

        assert_eq!(notice.subject, "Subscription Renewed");
        assert!(notice.keep_in_inbox);
        assert!(notice.body.contains("Monthly"));
        assert!(notice.body.contains("2026-11-18"));
    }

    #[test]
    fn expiring_notice_mentions_days_left() {
        let event = PlatformEvent::subscription(event_types::SUBSCRIPTION_EXPIRING, 1, 2)
            .with_payload(json!({ "plan_name": "Pro", "days_remaining": 3 }));
        let notice = notice_for(&event).unwrap();
        assert_eq!(notice.subject, "Subscription Expiring Soon");
        assert!(notice.body.contains("3 days left"));
    }

    #[test]
    fn orders_only_go_to_telegram() {
        let event = PlatformEvent::new(event_types::ORDER_PLACED)
            .with_business(4)
            .with_payload(json!({ "order_number": "ORD-20261019-ABC123", "total_cents": 1250 }));
        let notice = notice_for(&event).unwrap();
        assert!(!notice.keep_in_inbox);
        assert!(notice.body.contains("$12.50"));
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let event = PlatformEvent::new(event_types::PAYMENT_COMPLETED).with_business(1);
        assert_eq!(notice_for(&event), None);
        let event = PlatformEvent::subscription(event_types::SUBSCRIPTION_UPDATED, 1, 2)
            .with_payload(json!({ "plan_name": "Monthly", "auto_renew_changed": true }));
        assert_eq!(notice_for(&event), None);
    }
}
