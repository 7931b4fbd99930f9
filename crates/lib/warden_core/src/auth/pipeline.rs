//! Request pipeline for protected operations.
//!
//! Every protected request runs, in order and stopping at the first failure:
//!
//! 1. extract the bearer token from the `Authorization` header
//! 2. validate it with a [`TokenVerifier`]
//! 3. load the subject from the [`Directory`] (roles included)
//! 4. on role-gated operations, check the loaded roles with the gate
//!
//! Callers cannot tell an expired token from a forged one, nor a deleted user
//! from one that never existed.

use tracing::debug;

use super::AuthError;
use super::gate::{self, Decision};
use super::jwt::TokenVerifier;
use crate::directory::Directory;
use crate::models::auth::{TokenClaims, User};

/// Authorization scheme prefix, matched case-sensitively.
pub const BEARER_PREFIX: &str = "Bearer ";

/// An authenticated request's identity.
#[derive(Debug, Clone)]
pub struct Principal {
    /// The user as loaded from the directory for this request.
    pub user: User,
    /// The claims the token was issued with (role snapshot included).
    pub claims: TokenClaims,
}

/// Step 1: pull the token out of an `Authorization` header value.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header =
        header.ok_or_else(|| AuthError::Unauthenticated("Missing authorization header".into()))?;
    header
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| AuthError::Unauthenticated("Invalid authorization header format".into()))
}

/// Steps 1-3: resolve the caller behind an `Authorization` header.
pub async fn authenticate(
    header: Option<&str>,
    verifier: &dyn TokenVerifier,
    directory: &dyn Directory,
) -> Result<Principal, AuthError> {
    let token = extract_bearer(header)?;

    let claims = verifier
        .verify(token)
        .map_err(|_| AuthError::Unauthenticated("Invalid or expired token".into()))?;

    let user = directory.find_by_id(claims.sub).await?.ok_or_else(|| {
        debug!(user_id = %claims.sub, "token subject not found");
        AuthError::Unauthenticated("User not found".into())
    })?;

    Ok(Principal { user, claims })
}

/// Step 4: require at least one of `required` on the loaded user.
pub fn require_roles(principal: &Principal, required: &[&str]) -> Result<(), AuthError> {
    match gate::authorize(&principal.user, required) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            debug!(user_id = %principal.user.id, ?required, "insufficient role");
            Err(AuthError::Forbidden("Insufficient permissions".into()))
        }
    }
}
