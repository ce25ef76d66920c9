//! Turns lifecycle events into messages for restaurant owners.

pub mod dispatcher;

pub use dispatcher::NotificationDispatcher;
