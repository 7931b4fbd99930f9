//! User/role directory.
//!
//! The core only talks to storage through [`Directory`]. `PgDirectory` backs
//! the server; `MemoryDirectory` backs tests and local experiments.
//!
//! Soft-deleted users are invisible to every lookup. The association store
//! itself rejects duplicate (user, role) pairs, so callers may check-then-act
//! without locking and still rely on [`AuthError::Conflict`] for the race.

mod memory;
mod pg;

pub use memory::MemoryDirectory;
pub use pg::PgDirectory;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::auth::gate::SEEDED_ROLES;
use crate::models::auth::{NewUser, ProfileUpdate, Role, User, UserWithPassword};

/// Message used when an email is already registered.
pub const DUPLICATE_EMAIL: &str = "User already exists";

/// Message used when a (user, role) pair already exists.
pub const DUPLICATE_ROLE: &str = "User already has this role";

/// Storage port for users, roles and their association.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch a live user with roles.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Fetch a live user with roles and password hash, by exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError>;

    /// Whether an email has ever been registered, tombstoned rows included.
    async fn email_exists(&self, email: &str) -> Result<bool, AuthError>;

    /// Create a user holding `role`, creating the role if needed.
    ///
    /// Fails with `Conflict` if the email is taken.
    async fn create_user(
        &self,
        new_user: &NewUser,
        password_hash: &str,
        role: &str,
    ) -> Result<User, AuthError>;

    /// All live users, oldest first.
    async fn list_users(&self) -> Result<Vec<User>, AuthError>;

    /// Apply a partial update. `None` if the user does not exist.
    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AuthError>;

    /// Tombstone a user. `false` if there was no live user to delete.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, AuthError>;

    async fn find_role(&self, name: &str) -> Result<Option<Role>, AuthError>;

    /// Find a role by name, creating it if missing.
    async fn ensure_role(&self, name: &str) -> Result<Role, AuthError>;

    /// Associate a role. Fails with `Conflict` if the pair already exists.
    async fn assign_role(&self, user_id: Uuid, role: &Role) -> Result<(), AuthError>;

    /// Drop an association. `false` if it did not exist.
    async fn remove_role(&self, user_id: Uuid, role: &Role) -> Result<bool, AuthError>;
}

/// Make sure the built-in roles exist.
pub async fn seed_default_roles(directory: &dyn Directory) -> Result<(), AuthError> {
    for name in SEEDED_ROLES {
        let role = directory.ensure_role(name).await?;
        info!(role = %role.name, "role ready");
    }
    Ok(())
}
