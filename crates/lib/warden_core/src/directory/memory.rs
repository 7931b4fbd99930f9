//! In-memory directory.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DUPLICATE_EMAIL, DUPLICATE_ROLE, Directory};
use crate::auth::AuthError;
use crate::models::auth::{NewUser, ProfileUpdate, Role, User, UserWithPassword};

#[derive(Debug)]
struct StoredUser {
    /// `roles` is left empty here and filled from `assignments` on read.
    user: User,
    password_hash: String,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, StoredUser>,
    roles: BTreeMap<String, Role>,
    assignments: BTreeSet<(Uuid, Uuid)>,
}

impl State {
    fn live(&self, id: Uuid) -> Option<&StoredUser> {
        self.users.get(&id).filter(|s| s.deleted_at.is_none())
    }

    fn materialize(&self, stored: &StoredUser) -> User {
        let mut user = stored.user.clone();
        user.roles = self
            .roles
            .values()
            .filter(|role| self.assignments.contains(&(user.id, role.id)))
            .map(|role| role.name.clone())
            .collect();
        user
    }

    fn ensure_role(&mut self, name: &str) -> Role {
        self.roles
            .entry(name.to_string())
            .or_insert_with(|| {
                let now = Utc::now();
                Role {
                    id: Uuid::now_v7(),
                    name: name.to_string(),
                    created_at: now,
                    updated_at: now,
                }
            })
            .clone()
    }
}

/// Directory held in process memory behind a `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RwLock<State>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let state = self.state.read().await;
        Ok(state.live(id).map(|stored| state.materialize(stored)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|s| s.deleted_at.is_none())
            .find(|s| s.user.email == email)
            .map(|stored| UserWithPassword {
                user: state.materialize(stored),
                password_hash: stored.password_hash.clone(),
            }))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let state = self.state.read().await;
        Ok(state.users.values().any(|s| s.user.email == email))
    }

    async fn create_user(
        &self,
        new_user: &NewUser,
        password_hash: &str,
        role: &str,
    ) -> Result<User, AuthError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|s| s.user.email == new_user.email) {
            return Err(AuthError::Conflict(DUPLICATE_EMAIL.into()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            email: new_user.email.clone(),
            name: new_user.name.clone(),
            tel: new_user.tel.clone(),
            age: new_user.age,
            address: new_user.address.clone(),
            city: new_user.city.clone(),
            country: new_user.country.clone(),
            gender: new_user.gender.clone(),
            email_verified: false,
            roles: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        };
        let id = user.id;
        let role = state.ensure_role(role);
        state.assignments.insert((id, role.id));
        state.users.insert(
            id,
            StoredUser {
                user,
                password_hash: password_hash.to_string(),
                deleted_at: None,
            },
        );

        let stored = &state.users[&id];
        Ok(state.materialize(stored))
    }

    async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|s| s.deleted_at.is_none())
            .map(|stored| state.materialize(stored))
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AuthError> {
        let mut state = self.state.write().await;
        let Some(stored) = state
            .users
            .get_mut(&id)
            .filter(|s| s.deleted_at.is_none())
        else {
            return Ok(None);
        };

        let user = &mut stored.user;
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(tel) = &update.tel {
            user.tel = tel.clone();
        }
        if let Some(age) = update.age {
            user.age = age;
        }
        if let Some(address) = &update.address {
            user.address = address.clone();
        }
        if let Some(city) = &update.city {
            user.city = city.clone();
        }
        if let Some(country) = &update.country {
            user.country = country.clone();
        }
        if let Some(gender) = &update.gender {
            user.gender = gender.clone();
        }
        user.updated_at = Utc::now();

        Ok(state.live(id).map(|stored| state.materialize(stored)))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&id) {
            Some(stored) if stored.deleted_at.is_none() => {
                stored.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>, AuthError> {
        Ok(self.state.read().await.roles.get(name).cloned())
    }

    async fn ensure_role(&self, name: &str) -> Result<Role, AuthError> {
        Ok(self.state.write().await.ensure_role(name))
    }

    async fn assign_role(&self, user_id: Uuid, role: &Role) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        if state.live(user_id).is_none() {
            return Err(AuthError::NotFound("User not found".into()));
        }
        if !state.assignments.insert((user_id, role.id)) {
            return Err(AuthError::Conflict(DUPLICATE_ROLE.into()));
        }
        Ok(())
    }

    async fn remove_role(&self, user_id: Uuid, role: &Role) -> Result<bool, AuthError> {
        Ok(self.state.write().await.assignments.remove(&(user_id, role.id)))
    }
}
