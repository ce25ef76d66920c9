//! Periodic jobs.
//!
//! Each submodule exposes a `run` loop meant for `tokio::spawn`; all of them
//! stop when their [`CancellationToken`](tokio_util::sync::CancellationToken)
//! is cancelled.

pub mod access_log_cleanup;
pub mod cart_cleanup;
pub mod session_cleanup;
pub mod subscription_sweep;
