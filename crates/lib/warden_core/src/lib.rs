//! # warden_core
//!
//! Core authentication, authorization and directory logic for Warden.

pub mod auth;
pub mod directory;
pub mod migrate;
pub mod models;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
