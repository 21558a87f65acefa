//! User projection repository
//!
//! Row-level access to the locally-projected user table. The identity
//! provider owns principals; this table is the eventually-consistent
//! projection the payment and booking rows reference.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Repository for user projection rows
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

/// Database row for a user projection
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new user projection row
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email_verified: bool,
}

impl UserRepository {
    /// Creates a new repository over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Looks up a user row by id
    pub async fn find(&self, user_id: Uuid) -> Result<Option<UserRow>, DatabaseError> {
        sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, email, full_name, phone, email_verified, created_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Inserts a user projection row
    ///
    /// A concurrent insert of the same principal surfaces as
    /// `DatabaseError::DuplicateEntry`; callers racing the projection
    /// treat that as success and re-read.
    pub async fn insert(&self, user: NewUser) -> Result<UserRow, DatabaseError> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, full_name, phone, email_verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(user.email_verified)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(UserRow {
            user_id: user.user_id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            email_verified: user.email_verified,
            created_at: now,
        })
    }
}
