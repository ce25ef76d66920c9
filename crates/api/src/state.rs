use std::sync::Arc;

use backoffice_events::{EventBus, MessageSender};

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub pool: backoffice_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Lifecycle events, consumed by the notification dispatcher.
    pub event_bus: Arc<EventBus>,
    /// Outbound Telegram messages (bot replies and manual sends).
    pub telegram: Arc<dyn MessageSender>,
}
