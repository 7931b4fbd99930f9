//! Request and response bodies.
//!
//! Successful responses wrap their payload as `{"data": ...}`; errors are
//! `{"error": "<message>"}`.

use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;
use warden_core::auth::password::MAX_PASSWORD_BYTES;
use warden_core::models::auth::{NewUser, ProfileUpdate, User};

use crate::error::{AppError, AppResult, INVALID_INPUT};

/// Minimum display name length.
const MIN_NAME_LEN: usize = 2;

/// Success envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Error envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// User plus a fresh token pair (register and login).
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 2))]
    pub name: String,
    #[serde(default)]
    pub tel: String,
    #[serde(default)]
    pub age: i32,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl RegisterRequest {
    /// Field rules plus the bcrypt input limit, which is counted in bytes.
    pub fn check(&self) -> AppResult<()> {
        checked(self)?;
        if self.password.len() > MAX_PASSWORD_BYTES {
            return Err(invalid_input());
        }
        Ok(())
    }

    pub fn to_new_user(&self) -> NewUser {
        NewUser {
            email: self.email.clone(),
            name: self.name.clone(),
            tel: self.tel.clone(),
            age: self.age,
            address: self.address.clone(),
            city: self.city.clone(),
            country: self.country.clone(),
            gender: self.gender.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl LoginRequest {
    pub fn check(&self) -> AppResult<()> {
        checked(self)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

impl RefreshRequest {
    pub fn check(&self) -> AppResult<()> {
        checked(self)
    }
}

/// Partial profile update. Empty strings and a zero age are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub tel: Option<String>,
    pub age: Option<i32>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
}

impl UpdateUserRequest {
    /// Validate and reduce to the fields that will actually change.
    pub fn into_update(self) -> AppResult<ProfileUpdate> {
        let name = non_empty(self.name);
        if name
            .as_deref()
            .is_some_and(|n| n.chars().count() < MIN_NAME_LEN)
        {
            return Err(invalid_input());
        }
        Ok(ProfileUpdate {
            name,
            tel: non_empty(self.tel),
            age: self.age.filter(|age| *age != 0),
            address: non_empty(self.address),
            city: non_empty(self.city),
            country: non_empty(self.country),
            gender: non_empty(self.gender),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role_name: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn invalid_input() -> AppError {
    AppError::Validation(INVALID_INPUT.into())
}

/// Run the derived field rules; any failure is reported as `Invalid input`.
fn checked(body: &impl Validate) -> AppResult<()> {
    body.validate().map_err(|errors| {
        debug!(%errors, "request body failed validation");
        invalid_input()
    })
}
