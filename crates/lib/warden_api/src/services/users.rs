//! User administration: listing, profile updates, soft delete and role
//! assignment.

use tracing::info;
use uuid::Uuid;
use warden_core::auth::gate::{self, ADMIN_ROLE};
use warden_core::auth::pipeline::Principal;
use warden_core::directory::DUPLICATE_ROLE;
use warden_core::models::auth::User;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{MessageResponse, RoleRequest, UpdateUserRequest};

const USER_NOT_FOUND: &str = "User not found";
const ROLE_NOT_HELD: &str = "User doesn't have this role";
const USER_DELETED: &str = "User deleted successfully";

/// Path ids that do not parse can never match a user.
fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

fn not_found() -> AppError {
    AppError::NotFound(USER_NOT_FOUND.into())
}

async fn load(state: &AppState, id: Uuid) -> AppResult<User> {
    state.directory.find_by_id(id).await?.ok_or_else(not_found)
}

pub async fn list(state: &AppState) -> AppResult<Vec<User>> {
    Ok(state.directory.list_users().await?)
}

pub async fn get(state: &AppState, raw_id: &str) -> AppResult<User> {
    load(state, parse_id(raw_id)?).await
}

/// Partial profile update. Callers may update themselves; anyone else needs
/// `admin`.
pub async fn update(
    state: &AppState,
    actor: &Principal,
    raw_id: &str,
    body: UpdateUserRequest,
) -> AppResult<User> {
    let update = body.into_update()?;

    let id = match Uuid::parse_str(raw_id) {
        Ok(id) => id,
        Err(_) => {
            // Not the caller's own id, so the admin check comes first.
            forbid_unless(gate::authorize(&actor.user, &[ADMIN_ROLE]).is_allowed())?;
            return Err(not_found());
        }
    };
    forbid_unless(gate::authorize_update(&actor.user, id).is_allowed())?;

    let user = state
        .directory
        .update_profile(id, &update)
        .await?
        .ok_or_else(not_found)?;

    info!(actor = %actor.user.id, user_id = %user.id, "profile updated");
    Ok(user)
}

fn forbid_unless(allowed: bool) -> AppResult<()> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden("Insufficient permissions".into()))
    }
}

pub async fn delete(state: &AppState, raw_id: &str) -> AppResult<MessageResponse> {
    let id = parse_id(raw_id)?;
    if !state.directory.soft_delete(id).await? {
        return Err(not_found());
    }
    info!(user_id = %id, "user deleted");
    Ok(MessageResponse {
        message: USER_DELETED.into(),
    })
}

/// Grant a role, creating it if it does not exist yet.
pub async fn assign_role(state: &AppState, raw_id: &str, body: RoleRequest) -> AppResult<User> {
    let role_name = role_name(&body)?;
    let id = parse_id(raw_id)?;
    let user = load(state, id).await?;

    if user.has_role(&role_name) {
        return Err(AppError::Conflict(DUPLICATE_ROLE.into()));
    }

    let role = state.directory.ensure_role(&role_name).await?;
    // Races with a concurrent assignment surface as Conflict from the store.
    state.directory.assign_role(id, &role).await?;

    info!(user_id = %id, role = %role.name, "role assigned");
    load(state, id).await
}

pub async fn remove_role(state: &AppState, raw_id: &str, body: RoleRequest) -> AppResult<User> {
    let role_name = role_name(&body)?;
    let id = parse_id(raw_id)?;
    let user = load(state, id).await?;

    if !user.has_role(&role_name) {
        return Err(AppError::Conflict(ROLE_NOT_HELD.into()));
    }

    let removed = match state.directory.find_role(&role_name).await? {
        Some(role) => state.directory.remove_role(id, &role).await?,
        None => false,
    };
    if !removed {
        return Err(AppError::Conflict(ROLE_NOT_HELD.into()));
    }

    info!(user_id = %id, role = %role_name, "role removed");
    load(state, id).await
}

fn role_name(body: &RoleRequest) -> AppResult<String> {
    let name = gate::normalize_role_name(&body.role_name);
    if name.is_empty() {
        return Err(AppError::Validation(crate::error::INVALID_INPUT.into()));
    }
    Ok(name)
}
