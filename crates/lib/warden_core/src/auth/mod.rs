//! Authentication and authorization logic.
//!
//! Provides password hashing, JWT issuance and validation, the role gate and
//! the request pipeline shared by the HTTP layer.

pub mod gate;
pub mod jwt;
pub mod password;
pub mod pipeline;

use thiserror::Error;

/// Authentication errors.
///
/// Display strings are safe to show to clients except for the internal
/// variants (`Hashing`, `Signing`, `DbError`, `Internal`), which the API layer
/// replaces with a generic message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    TokenInvalid,

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Hashing failure: {0}")]
    Hashing(String),

    #[error("Signing failure: {0}")]
    Signing(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
