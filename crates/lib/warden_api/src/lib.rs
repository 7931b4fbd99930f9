//! # warden_api
//!
//! HTTP API library for Warden.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use warden_core::auth::AuthError;
use warden_core::auth::gate::ADMIN_ROLE;
use warden_core::auth::jwt::TokenService;
use warden_core::auth::password::CredentialHasher;
use warden_core::directory::Directory;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, users};
use crate::middleware::auth::{require_auth, require_roles};

/// Roles accepted on the user-management routes.
pub const ADMIN_ONLY: &[&str] = &[ADMIN_ROLE];

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User/role storage.
    pub directory: Arc<dyn Directory>,
    /// Token issuance and validation.
    pub tokens: Arc<TokenService>,
    /// Password hashing.
    pub hasher: CredentialHasher,
}

impl AppState {
    /// Wire the state from configuration and a directory implementation.
    pub fn new(config: &ApiConfig, directory: Arc<dyn Directory>) -> Result<Self, AuthError> {
        Ok(Self {
            directory,
            tokens: Arc::new(TokenService::new(config.token_config())?),
            hasher: CredentialHasher::new(config.bcrypt_cost)?,
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `warden_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    warden_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler));

    // Admin routes (auth + admin role)
    let admin = Router::new()
        .route("/api/users", get(users::list_users_handler))
        .route(
            "/api/users/{id}",
            get(users::get_user_handler).delete(users::delete_user_handler),
        )
        .route(
            "/api/users/{id}/roles",
            post(users::assign_role_handler).delete(users::remove_role_handler),
        )
        .route_layer(from_fn_with_state(ADMIN_ONLY, require_roles));

    // Protected routes (require auth). Updates check self-or-admin in the service.
    let protected = Router::new()
        .route("/api/profile", get(auth::profile_handler))
        .route("/api/users/{id}", put(users::update_user_handler))
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
