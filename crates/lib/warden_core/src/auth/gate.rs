//! Role-based authorization decisions.
//!
//! Pure policy: no IO, no token parsing. Callers pass the identity loaded
//! for the current request, so the roles checked here are the directory's
//! roles, not the snapshot inside the token.

use uuid::Uuid;

use crate::models::auth::User;

/// Role every new registration receives.
pub const DEFAULT_ROLE: &str = "user";

/// Role required by the user-management routes.
pub const ADMIN_ROLE: &str = "admin";

/// Roles that must exist before any assignment runs.
pub const SEEDED_ROLES: [&str; 2] = [DEFAULT_ROLE, ADMIN_ROLE];

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Allow iff the user holds at least one of `required` (exact match).
pub fn authorize(user: &User, required: &[&str]) -> Decision {
    if required.iter().any(|role| user.has_role(role)) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Users may always update themselves; anyone else needs `admin`.
pub fn authorize_update(actor: &User, target: Uuid) -> Decision {
    if actor.id == target {
        Decision::Allow
    } else {
        authorize(actor, &[ADMIN_ROLE])
    }
}

/// Canonical form of a role name: trimmed and lowercased.
pub fn normalize_role_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}
