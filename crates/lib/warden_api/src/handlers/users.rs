//! User administration handlers.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use warden_core::models::auth::User;

use super::AppJson;
use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{DataResponse, MessageResponse, RoleRequest, UpdateUserRequest};
use crate::services::users;

/// `GET /api/users`
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<User>>>> {
    let list = users::list(&state).await?;
    Ok(Json(DataResponse::new(list)))
}

/// `GET /api/users/{id}`
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = users::get(&state, &id).await?;
    Ok(Json(DataResponse::new(user)))
}

/// `PUT /api/users/{id}`: self or admin.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(principal)): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    AppJson(body): AppJson<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = users::update(&state, &principal, &id, body).await?;
    Ok(Json(DataResponse::new(user)))
}

/// `DELETE /api/users/{id}`: soft delete.
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<MessageResponse>>> {
    let resp = users::delete(&state, &id).await?;
    Ok(Json(DataResponse::new(resp)))
}

/// `POST /api/users/{id}/roles`
pub async fn assign_role_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<RoleRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = users::assign_role(&state, &id, body).await?;
    Ok(Json(DataResponse::new(user)))
}

/// `DELETE /api/users/{id}/roles`
pub async fn remove_role_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(body): AppJson<RoleRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    let user = users::remove_role(&state, &id, body).await?;
    Ok(Json(DataResponse::new(user)))
}
