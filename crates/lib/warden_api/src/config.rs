//! API server configuration.

use std::fmt;

use thiserror::Error;
use warden_core::auth::jwt::TokenConfig;
use warden_core::auth::password::{CredentialHasher, DEFAULT_COST};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Configuration errors. Any of these stops the process before it binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {0}: {1}")]
    Invalid(&'static str, String),
}

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:8080").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// bcrypt cost for new password hashes.
    pub bcrypt_cost: u32,
    /// Enforce access/refresh token kinds.
    pub strict_token_kind: bool,
}

impl ApiConfig {
    /// Build a configuration, refusing an empty connection string or secret.
    pub fn new(
        port: u16,
        database_url: impl Into<String>,
        jwt_secret: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let database_url = database_url.into();
        let jwt_secret = jwt_secret.into();
        if database_url.trim().is_empty() {
            return Err(ConfigError::Missing("DB_DSN"));
        }
        if jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        Ok(Self {
            bind_addr: format!("0.0.0.0:{port}"),
            database_url,
            jwt_secret,
            bcrypt_cost: DEFAULT_COST,
            strict_token_kind: false,
        })
    }

    /// Override the bcrypt cost, rejecting values bcrypt cannot use.
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Result<Self, ConfigError> {
        CredentialHasher::new(cost)
            .map_err(|e| ConfigError::Invalid("BCRYPT_COST", e.to_string()))?;
        self.bcrypt_cost = cost;
        Ok(self)
    }

    pub fn with_strict_token_kind(mut self, strict: bool) -> Self {
        self.strict_token_kind = strict;
        self
    }

    /// Token service settings derived from this configuration.
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(self.jwt_secret.clone()).with_strict_token_kind(self.strict_token_kind)
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("strict_token_kind", &self.strict_token_kind)
            .finish()
    }
}
