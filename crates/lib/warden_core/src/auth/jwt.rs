//! JWT token issuance and verification.
//!
//! Tokens are HS256-signed and come in pairs built from one claim template:
//! a 15 minute access token and a 7 day refresh token. Both carry a snapshot
//! of the user's role names; nothing re-checks that snapshot until the next
//! directory lookup.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenKind, TokenPair, User};

/// Issuer written into and required from every token.
pub const DEFAULT_ISSUER: &str = "warden";

/// Access token lifetime: 15 minutes.
const ACCESS_TOKEN_EXPIRY_SECS: i64 = 15 * 60;

/// Refresh token lifetime: 7 days.
const REFRESH_TOKEN_EXPIRY_SECS: i64 = 7 * 24 * 60 * 60;

/// The only algorithm accepted on the way in.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Token service configuration.
#[derive(Clone)]
pub struct TokenConfig {
    /// HMAC signing secret.
    pub secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Require `kind = access` on protected requests and `kind = refresh` on
    /// the refresh flow. Off by default: either token works in either place.
    pub strict_token_kind: bool,
}

impl TokenConfig {
    /// Configuration with the default issuer and lifetimes.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            access_ttl: Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS),
            refresh_ttl: Duration::seconds(REFRESH_TOKEN_EXPIRY_SECS),
            strict_token_kind: false,
        }
    }

    pub fn with_strict_token_kind(mut self, strict: bool) -> Self {
        self.strict_token_kind = strict;
        self
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("strict_token_kind", &self.strict_token_kind)
            .finish()
    }
}

/// Verifies bearer tokens presented on protected requests.
///
/// The request pipeline only sees this trait, so a verifier that consults a
/// revocation source can replace `TokenService` without pipeline changes.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError>;
}

/// Why a token was rejected. Logged, never returned to callers.
#[derive(Debug)]
enum Rejection {
    Decode(jsonwebtoken::errors::Error),
    Expired,
    NotYetValid,
    WrongKind(Option<TokenKind>),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Decode(e) => write!(f, "decode: {e}"),
            Rejection::Expired => f.write_str("expired"),
            Rejection::NotYetValid => f.write_str("not yet valid"),
            Rejection::WrongKind(kind) => write!(f, "wrong token kind: {kind:?}"),
        }
    }
}

/// Issues and validates signed token pairs.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    strict_token_kind: bool,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("strict_token_kind", &self.strict_token_kind)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Result<Self, AuthError> {
        if config.secret.is_empty() {
            return Err(AuthError::InvalidInput("JWT secret must not be empty".into()));
        }

        // Time checks run in `check` against an explicit clock.
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            strict_token_kind: config.strict_token_kind,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issue an access/refresh pair for `user` as of now.
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(user, Utc::now())
    }

    /// Issue an access/refresh pair as of `now`.
    pub fn issue_pair_at(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let roles = user.role_names();
        Ok(TokenPair {
            access_token: self.sign(user, &roles, TokenKind::Access, now, self.access_ttl)?,
            refresh_token: self.sign(user, &roles, TokenKind::Refresh, now, self.refresh_ttl)?,
        })
    }

    fn sign(
        &self,
        user: &User,
        roles: &[String],
        kind: TokenKind,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let claims = TokenClaims {
            sub: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            roles: roles.to_vec(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            kind: Some(kind),
        };
        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(format!("jwt encode: {e}")))
    }

    /// Validate a token presented on a protected request.
    pub fn validate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, AuthError> {
        self.check(token, TokenKind::Access, now)
    }

    /// Validate a token presented to the refresh flow.
    ///
    /// Same checks as [`validate`](Self::validate); the kind is only enforced
    /// with `strict_token_kind`.
    pub fn validate_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate_refresh_at(token, Utc::now())
    }

    pub fn validate_refresh_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, AuthError> {
        self.check(token, TokenKind::Refresh, now)
    }

    fn check(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, AuthError> {
        self.inspect(token, expected, now).map_err(|reason| {
            debug!(%reason, ?expected, "token rejected");
            AuthError::TokenInvalid
        })
    }

    fn inspect(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<TokenClaims, Rejection> {
        let claims = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(Rejection::Decode)?
            .claims;

        let now = now.timestamp();
        if now >= claims.exp {
            return Err(Rejection::Expired);
        }
        if now < claims.nbf {
            return Err(Rejection::NotYetValid);
        }
        if self.strict_token_kind && claims.kind != Some(expected) {
            return Err(Rejection::WrongKind(claims.kind));
        }
        Ok(claims)
    }
}

impl TokenVerifier for TokenService {
    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.validate(token)
    }
}
