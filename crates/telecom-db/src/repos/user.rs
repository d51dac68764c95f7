use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use telecom_common::models::auth::{Role, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn role(&self) -> Result<Role> {
        self.role
            .parse()
            .with_context(|| format!("User {} has an invalid stored role", self.id))
    }

    /// Client-safe view: drops the password hash.
    pub fn into_user(self) -> Result<User> {
        let role = self.role()?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Fields to overwrite on update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

pub struct UserRepo;

impl UserRepo {
    pub async fn create(
        pool: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(pool)
        .await
        .context("Failed to create user")?;
        Ok(row)
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by email")?;
        Ok(row)
    }

    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by id")?;
        Ok(row)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(pool)
        .await
        .context("Failed to list users")?;
        Ok(rows)
    }

    /// Apply `changes` and return the updated row, or `None` if no such user.
    pub async fn update(pool: &PgPool, id: i64, changes: &UserChanges) -> Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                role = COALESCE($5, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.password_hash.as_deref())
        .bind(changes.role.map(|r| r.as_str()))
        .fetch_optional(pool)
        .await
        .context("Failed to update user")?;
        Ok(row)
    }

    /// Delete a user; their contracts and services go with them.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to delete user")?;
        Ok(result.rows_affected() > 0)
    }
}
