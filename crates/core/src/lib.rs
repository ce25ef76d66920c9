//! Pure domain logic shared by the database and API layers.
//!
//! Nothing in this crate touches the network or the database. Modules hold
//! constants, validation helpers, state machines, and the arithmetic behind
//! subscriptions, attendance, scoring, and ordering.

pub mod attendance;
pub mod business;
pub mod codes;
pub mod error;
pub mod ordering;
pub mod pagination;
pub mod payment;
pub mod roles;
pub mod scoring;
pub mod subscription;
pub mod survey;
pub mod telegram;
pub mod types;
