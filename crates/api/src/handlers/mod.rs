//! Request handlers, one module per resource.

pub mod attendance;
pub mod auth;
pub mod businesses;
pub mod carts;
pub mod classes;
pub mod messages;
pub mod orders;
pub mod payments;
pub mod plans;
pub mod products;
pub mod schedules;
pub mod scoring;
pub mod subscriptions;
pub mod surveys;
pub mod telegram;
pub mod users;
