//! Authentication request handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use warden_core::models::auth::{TokenPair, User};

use super::AppJson;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AuthResponse, DataResponse, LoginRequest, RefreshRequest, RegisterRequest};
use crate::services::auth;

/// `POST /api/auth/register`: create a new user account.
pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AuthResponse>>)> {
    let resp = auth::register(&state, body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(resp))))
}

/// `POST /api/auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let resp = auth::login(&state, body).await?;
    Ok(Json(DataResponse::new(resp)))
}

/// `POST /api/auth/refresh`: exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    AppJson(body): AppJson<RefreshRequest>,
) -> AppResult<Json<DataResponse<TokenPair>>> {
    let pair = auth::refresh(&state, body).await?;
    Ok(Json(DataResponse::new(pair)))
}

/// `GET /api/profile`: the caller as loaded for this request.
pub async fn profile_handler(
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
) -> Json<DataResponse<User>> {
    Json(DataResponse::new(principal.user))
}
