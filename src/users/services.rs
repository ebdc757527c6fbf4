use anyhow::Context;
use tracing::{info, warn};

use super::{
    dto::{normalize_email, normalize_username, NewUserRequest},
    repo_types::{NewUser, User},
};
use crate::{auth::password::hash_password, error::ApiError, state::AppState};

/// Validates, hashes and stores a new user. Shared by registration and the
/// admin create endpoint.
pub async fn create_user(state: &AppState, payload: NewUserRequest) -> Result<User, ApiError> {
    let username = normalize_username(&payload.username)?;
    let email = normalize_email(payload.email)?;
    if payload.password.is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }

    // Fast path only; the unique constraints decide under concurrency.
    if state.store.find_by_username(&username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(ApiError::Conflict("username already exists".into()));
    }
    if let Some(email) = &email {
        if state.store.find_by_email(email).await?.is_some() {
            warn!(%email, "email already registered");
            return Err(ApiError::Conflict("email already exists".into()));
        }
    }

    let hashing = state.config.hashing;
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&hashing, &password))
        .await
        .context("hash_password task")??;

    let user = state
        .store
        .insert(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    info!(user_id = user.id, username = %user.username, "user created");
    Ok(user)
}
