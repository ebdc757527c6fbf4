use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::repo_types::User;
use crate::error::ApiError;

const MAX_USERNAME_LEN: usize = 64;

/// Body of `POST /register` and `POST /users`.
#[derive(Deserialize)]
pub struct NewUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

/// Body of `PUT /users/:id`. Both fields are replaced.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_username(raw: &str) -> Result<String, ApiError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(ApiError::Validation("username is required".into()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::Validation(format!(
            "username must be at most {MAX_USERNAME_LEN} characters"
        )));
    }
    Ok(username.to_string())
}

/// Blank counts as absent; anything else is trimmed, lowercased and checked.
pub(crate) fn normalize_email(raw: Option<String>) -> Result<Option<String>, ApiError> {
    let Some(email) = raw.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()) else {
        return Ok(None);
    };
    if !is_valid_email(&email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    Ok(Some(email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn public_user_has_no_password_field() {
        let user = User {
            id: 1,
            username: "alice".into(),
            email: Some("a@x.com".into()),
            password_hash: "$argon2id$secret".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 1, "username": "alice", "email": "a@x.com"})
        );
    }

    #[test]
    fn stored_row_never_serializes_hash() {
        let user = User {
            id: 7,
            username: "bob".into(),
            email: None,
            password_hash: "$argon2id$secret".into(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            normalize_email(Some("  Alice@Example.COM ".into())).unwrap(),
            Some("alice@example.com".into())
        );
        assert_eq!(normalize_email(Some("   ".into())).unwrap(), None);
        assert_eq!(normalize_email(None).unwrap(), None);
        assert!(normalize_email(Some("not-an-email".into())).is_err());
    }

    #[test]
    fn username_rules() {
        assert_eq!(normalize_username("  alice ").unwrap(), "alice");
        assert!(normalize_username("   ").is_err());
        assert!(normalize_username(&"x".repeat(65)).is_err());
    }
}
