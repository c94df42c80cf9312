/// User model and database operations
///
/// This module provides the User model and the typed repository operations
/// used by the auth flows. Users are soft-deleted: deletion stamps
/// `deleted_at` and rewrites the email to free the uniqueness constraint,
/// and every auth-facing lookup excludes deleted rows.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     name VARCHAR(100),
///     role VARCHAR(20) NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teambase_shared::models::user::{User, CreateUser};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: "owner".to_string(),
/// }).await?;
///
/// let found = User::find_active_by_email(&pool, "user@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};

/// Lifecycle state of a user account
///
/// Derived from the `deleted_at` column so callers branch on an explicit
/// tagged state instead of a nullable timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLifecycle {
    /// Account is live and may authenticate
    Active,

    /// Account was soft-deleted at the given time; excluded from all
    /// auth-facing lookups
    Deleted { at: DateTime<Utc> },
}

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: i64,

    /// Email address (unique; rewritten on soft delete)
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Account-level role ("owner" or "member")
    pub role: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the account was soft-deleted (None while active)
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Gets the tagged lifecycle state for this account
    pub fn lifecycle(&self) -> UserLifecycle {
        match self.deleted_at {
            None => UserLifecycle::Active,
            Some(at) => UserLifecycle::Deleted { at },
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT a plaintext password)
    pub password_hash: String,

    /// Account-level role
    pub role: String,
}

impl User {
    /// Creates a new user
    ///
    /// Takes any executor so sign-up can run the insert inside a
    /// transaction alongside the team and membership writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (unique constraint) or
    /// the database is unreachable.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, role)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, name, role,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    /// Finds an active (not soft-deleted) user by ID
    pub async fn find_active_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, role,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds an active (not soft-deleted) user by email
    ///
    /// Used for sign-in and duplicate-email checks; soft-deleted records
    /// never match, so a freed email can re-register.
    pub async fn find_active_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, role,
                   created_at, updated_at, deleted_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates the display name and email of an account
    ///
    /// # Errors
    ///
    /// Returns an error if the new email collides with another account.
    pub async fn update_account(
        pool: &PgPool,
        id: i64,
        name: &str,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, email = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, email, password_hash, name, role,
                      created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Replaces the stored password hash
    ///
    /// Returns true if an active user row was updated.
    pub async fn update_password_hash(
        pool: &PgPool,
        id: i64,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft-deletes an account
    ///
    /// Stamps `deleted_at` and rewrites the email to
    /// `{email}-{id}-deleted`, freeing the unique constraint so the address
    /// can be used by a future registration. The row itself is retained.
    ///
    /// Returns true if an active user row was deleted.
    pub async fn soft_delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = NOW(),
                updated_at = NOW(),
                email = email || '-' || id::text || '-deleted'
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
