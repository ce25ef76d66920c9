//! Broadcast event bus shared as `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use backoffice_core::types::DbId;

/// A domain event.
///
/// Build with [`PlatformEvent::new`] and the `with_*` methods. Events about a
/// restaurant carry its id in [`business_id`](Self::business_id) so
/// notification consumers do not have to look it up again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated name from [`crate::event_types`].
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    pub business_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            business_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Shorthand for an event about one subscription of one business.
    pub fn subscription(event_type: &str, subscription_id: DbId, business_id: DbId) -> Self {
        Self::new(event_type)
            .with_source("subscription", subscription_id)
            .with_business(business_id)
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_business(mut self, business_id: DbId) -> Self {
        self.business_id = Some(business_id);
        self
    }

    /// `None` for events raised by background jobs.
    pub fn with_actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_user_id = user_id;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// String field from the payload, if present.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(|v| v.as_str())
    }
}

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus. Slow receivers see `RecvError::Lagged` once the buffer fills.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to current subscribers. Returns how many received it; with no
    /// subscribers the event is dropped and 0 is returned.
    pub fn publish(&self, event: PlatformEvent) -> usize {
        let event_type = event.event_type.clone();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(event_type, "No subscribers, event dropped");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_types;

    #[tokio::test]
    async fn subscription_event_reaches_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let delivered = bus.publish(
            PlatformEvent::subscription(event_types::SUBSCRIPTION_RENEWED, 11, 3)
                .with_actor(Some(1))
                .with_payload(serde_json::json!({"plan_name": "Monthly"})),
        );
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, "subscription.renewed");
        assert_eq!(event.source_entity_type.as_deref(), Some("subscription"));
        assert_eq!(event.source_entity_id, Some(11));
        assert_eq!(event.business_id, Some(3));
        assert_eq!(event.actor_user_id, Some(1));
        assert_eq!(event.payload_str("plan_name"), Some("Monthly"));
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.publish(PlatformEvent::new(event_types::ORDER_PLACED)), 2);
        assert_eq!(a.recv().await.unwrap().event_type, "order.placed");
        assert_eq!(b.recv().await.unwrap().event_type, "order.placed");
    }

    #[test]
    fn publish_without_subscribers_returns_zero() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(PlatformEvent::new("orphan")), 0);
    }

    #[test]
    fn bare_event_has_no_context() {
        let event = PlatformEvent::new("bare");
        assert!(event.business_id.is_none());
        assert!(event.actor_user_id.is_none());
        assert!(event.payload.is_object());
        assert!(event.payload_str("missing").is_none());
    }
}
