use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,                    // server-assigned id
    pub username: String,           // unique
    pub email: Option<String>,      // unique when present
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 PHC string, never exposed
    pub created_at: OffsetDateTime, // creation timestamp
}

/// Row to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}

/// Fields an update may replace.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub username: String,
    pub email: Option<String>,
}
