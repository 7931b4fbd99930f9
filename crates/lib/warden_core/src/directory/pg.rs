//! PostgreSQL-backed directory.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{DUPLICATE_EMAIL, DUPLICATE_ROLE, Directory};
use crate::auth::AuthError;
use crate::models::auth::{NewUser, ProfileUpdate, Role, User, UserWithPassword};

const USER_COLUMNS: &str = "id, email, name, tel, age, address, city, country, gender, \
     email_verified, created_at, updated_at, password_hash";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    tel: String,
    age: i32,
    address: String,
    city: String,
    country: String,
    gender: String,
    email_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    password_hash: String,
}

impl UserRow {
    fn into_user(self, roles: BTreeSet<String>) -> UserWithPassword {
        UserWithPassword {
            user: User {
                id: self.id,
                email: self.email,
                name: self.name,
                tel: self.tel,
                age: self.age,
                address: self.address,
                city: self.city,
                country: self.country,
                gender: self.gender,
                email_verified: self.email_verified,
                roles,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        }
    }
}

type RoleRow = (Uuid, String, DateTime<Utc>, DateTime<Utc>);

fn role_from_row((id, name, created_at, updated_at): RoleRow) -> Role {
    Role {
        id,
        name,
        created_at,
        updated_at,
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `DbError`.
fn conflict_on_unique(e: sqlx::Error, message: &str) -> AuthError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AuthError::Conflict(message.to_string())
        }
        _ => AuthError::DbError(e),
    }
}

/// PostgreSQL implementation of [`Directory`].
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Role names for each of `ids`, in one round trip.
    async fn roles_for(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, BTreeSet<String>>, AuthError> {
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT ur.user_id, r.name \
             FROM user_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             WHERE ur.user_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut roles: HashMap<Uuid, BTreeSet<String>> = HashMap::new();
        for (user_id, name) in rows {
            roles.entry(user_id).or_default().insert(name);
        }
        Ok(roles)
    }

    async fn with_roles(&self, row: UserRow) -> Result<UserWithPassword, AuthError> {
        let roles = self
            .roles_for(&[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();
        Ok(row.into_user(roles))
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_roles(row).await?.user)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.with_roles(row).await?)),
            None => Ok(None),
        }
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_user(
        &self,
        new_user: &NewUser,
        password_hash: &str,
        role: &str,
    ) -> Result<User, AuthError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users \
             (id, email, name, tel, age, address, city, country, gender, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(&new_user.email)
        .bind(&new_user.name)
        .bind(&new_user.tel)
        .bind(new_user.age)
        .bind(&new_user.address)
        .bind(&new_user.city)
        .bind(&new_user.country)
        .bind(&new_user.gender)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_EMAIL))?;

        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(Uuid::now_v7())
            .bind(role)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) \
             SELECT $1, id FROM roles WHERE name = $2",
        )
        .bind(row.id)
        .bind(role)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into_user(BTreeSet::from([role.to_string()])).user)
    }

    async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut roles = self.roles_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let user_roles = roles.remove(&row.id).unwrap_or_default();
                row.into_user(user_roles).user
            })
            .collect())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AuthError> {
        let result = sqlx::query(
            "UPDATE users SET \
               name = COALESCE($2, name), \
               tel = COALESCE($3, tel), \
               age = COALESCE($4, age), \
               address = COALESCE($5, address), \
               city = COALESCE($6, city), \
               country = COALESCE($7, country), \
               gender = COALESCE($8, gender), \
               updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.tel.as_deref())
        .bind(update.age)
        .bind(update.address.as_deref())
        .bind(update.city.as_deref())
        .bind(update.country.as_deref())
        .bind(update.gender.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = now(), updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_role(&self, name: &str) -> Result<Option<Role>, AuthError> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name, created_at, updated_at FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(role_from_row))
    }

    async fn ensure_role(&self, name: &str) -> Result<Role, AuthError> {
        sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(Uuid::now_v7())
            .bind(name)
            .execute(&self.pool)
            .await?;

        self.find_role(name)
            .await?
            .ok_or_else(|| AuthError::Internal(format!("role '{name}' vanished after upsert")))
    }

    async fn assign_role(&self, user_id: Uuid, role: &Role) -> Result<(), AuthError> {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role.id)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, DUPLICATE_ROLE))?;
        Ok(())
    }

    async fn remove_role(&self, user_id: Uuid, role: &Role) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
