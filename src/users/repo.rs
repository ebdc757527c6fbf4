use std::{future::Future, time::Duration};

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use super::repo_types::{NewUser, User, UserChanges};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("store call timed out")]
    Timeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Row-level access to the `users` table. Uniqueness of username and email
/// is enforced here, not by callers.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when username or email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list(&self) -> Result<Vec<User>, StoreError>;
    /// Returns the row as stored after the update, `None` if `id` is unknown.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, StoreError>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}

pub struct PgUserStore {
    db: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn timed<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| StoreError::Timeout)?
            .map_err(classify)
    }
}

fn classify(e: sqlx::Error) -> StoreError {
    let duplicate = e
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| match db.constraint() {
            Some("users_email_key") => "email",
            _ => "username",
        });
    match duplicate {
        Some(field) => StoreError::Duplicate(field),
        None => StoreError::Database(e),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        self.timed(
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (username, email, password_hash)
                VALUES ($1, $2, $3)
                RETURNING id, username, email, password_hash, created_at
                "#,
            )
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.timed(
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, created_at
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.timed(
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, created_at
                FROM users
                WHERE username = $1
                "#,
            )
            .bind(username)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.timed(
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, created_at
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        self.timed(
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, username, email, password_hash, created_at
                FROM users
                ORDER BY id
                "#,
            )
            .fetch_all(&self.db),
        )
        .await
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, StoreError> {
        self.timed(
            sqlx::query_as::<_, User>(
                r#"
                UPDATE users
                SET username = $1, email = $2
                WHERE id = $3
                RETURNING id, username, email, password_hash, created_at
                "#,
            )
            .bind(&changes.username)
            .bind(&changes.email)
            .bind(id)
            .fetch_optional(&self.db),
        )
        .await
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = self
            .timed(
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(id)
                    .execute(&self.db),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
