//! Authentication service: register/login/refresh flows delegating to
//! `warden_core::auth` and the directory.

use tracing::{debug, info};
use warden_core::auth::AuthError;
use warden_core::auth::gate::DEFAULT_ROLE;
use warden_core::directory::DUPLICATE_EMAIL;
use warden_core::models::auth::TokenPair;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest};

const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";
const USER_NOT_FOUND: &str = "User not found";

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Create an account holding the default role and sign it in.
pub async fn register(state: &AppState, body: RegisterRequest) -> AppResult<AuthResponse> {
    body.check()?;

    if state.directory.email_exists(&body.email).await? {
        return Err(AppError::Conflict(DUPLICATE_EMAIL.into()));
    }

    let password_hash = state.hasher.hash(&body.password)?;
    let user = state
        .directory
        .create_user(&body.to_new_user(), &password_hash, DEFAULT_ROLE)
        .await?;

    let TokenPair {
        access_token,
        refresh_token,
    } = state.tokens.issue_pair(&user)?;

    info!(user_id = %user.id, "user registered");
    Ok(AuthResponse {
        user,
        access_token,
        refresh_token,
    })
}

/// Authenticate with email + password.
///
/// Unknown email and wrong password produce the same error.
pub async fn login(state: &AppState, body: LoginRequest) -> AppResult<AuthResponse> {
    body.check()?;

    let Some(found) = state.directory.find_by_email(&body.email).await? else {
        debug!("login for unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    if !state.hasher.verify(&body.password, &found.password_hash)? {
        debug!(user_id = %found.user.id, "login with wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let user = found.user;
    let TokenPair {
        access_token,
        refresh_token,
    } = state.tokens.issue_pair(&user)?;

    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        user,
        access_token,
        refresh_token,
    })
}

/// Exchange a refresh token for a new pair built from the user's current roles.
///
/// Refresh tokens are stateless; the presented one stays valid until it expires.
pub async fn refresh(state: &AppState, body: RefreshRequest) -> AppResult<TokenPair> {
    body.check()?;

    let claims = state
        .tokens
        .validate_refresh(&body.refresh_token)
        .map_err(|_| AppError::Unauthorized(INVALID_REFRESH_TOKEN.into()))?;

    let user = state
        .directory
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized(USER_NOT_FOUND.into()))?;

    let pair = state.tokens.issue_pair(&user)?;
    info!(user_id = %user.id, "token pair refreshed");
    Ok(pair)
}
