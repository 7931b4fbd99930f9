//! Authentication middleware: bearer token extraction, JWT verification,
//! identity loading and role checks.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use warden_core::auth::pipeline::{self, Principal};

use crate::AppState;
use crate::error::AppError;

/// Request extension holding the resolved caller.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

/// Axum middleware: runs the pipeline up to identity loading and injects
/// `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Header values that are not visible ASCII count as malformed.
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or("").to_owned());

    let principal = pipeline::authenticate(
        header.as_deref(),
        state.tokens.as_ref(),
        state.directory.as_ref(),
    )
    .await?;

    request.extensions_mut().insert(AuthenticatedUser(principal));

    Ok(next.run(request).await)
}

/// Axum middleware: requires one of the roles in its state. Must run inside
/// `require_auth`.
pub async fn require_roles(
    State(required): State<&'static [&'static str]>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    {
        let AuthenticatedUser(principal) = request
            .extensions()
            .get::<AuthenticatedUser>()
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".into()))?;
        pipeline::require_roles(principal, required)?;
    }

    Ok(next.run(request).await)
}
