//! Multi-step operations shared by handlers and background jobs.

pub mod subscriptions;

pub use subscriptions::SubscriptionService;
