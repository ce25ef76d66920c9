//! Back-office API server library.
//!
//! Exposes config, state, error handling, routes and background jobs so the
//! binary entrypoint and the integration tests build the same application.

pub mod auth;
pub mod background;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notifications;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod services;
pub mod state;
