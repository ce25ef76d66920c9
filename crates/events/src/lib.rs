//! In-process events and outbound notification delivery.
//!
//! - [`EventBus`] fans [`PlatformEvent`]s out to subscribers over a
//!   `tokio::sync::broadcast` channel.
//! - [`event_types`] names every event the platform publishes.
//! - [`TelegramClient`] delivers text to Telegram chats through the Bot API,
//!   behind the [`MessageSender`] trait so callers can swap in a fake.

pub mod bus;
pub mod event_types;
pub mod telegram;

pub use bus::{EventBus, PlatformEvent};
pub use telegram::{MessageSender, TelegramClient, TelegramConfig, TelegramError};
