//! Credentials and tokens.
//!
//! - [`password`] hashes and checks passwords with Argon2id.
//! - [`jwt`] issues and validates access tokens and derives refresh-token hashes.

pub mod jwt;
pub mod password;
