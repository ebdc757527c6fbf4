use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{LoginRequest, LoginResponse, MessageResponse},
    extractors::TOKEN_COOKIE,
    password::{verify_against_dummy, verify_password},
};
use crate::{
    error::ApiError,
    state::AppState,
    users::{dto::NewUserRequest, services},
};

const INVALID_CREDENTIALS: &str = "invalid credentials";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<NewUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(payload) = payload?;
    let user = services::create_user(&state, payload).await?;
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "user registered",
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<([(header::HeaderName, HeaderValue); 1], Json<LoginResponse>), ApiError> {
    let Json(payload) = payload?;
    let username = payload.username.trim().to_string();
    let password = payload.password;

    let Some(user) = state.store.find_by_username(&username).await? else {
        let dummy = state.dummy_hash.clone();
        tokio::task::spawn_blocking(move || verify_against_dummy(&password, &dummy))
            .await
            .context("verify_against_dummy task")?;
        warn!(%username, "login unknown username");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    };

    let stored = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .context("verify_password task")??;
    if !ok {
        warn!(%username, user_id = user.id, "login invalid password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    let token = state.keys.sign(user.id, &user.username)?;
    let cookie = session_cookie(&token, state.keys.ttl().as_secs(), state.config.cookie_secure)?;

    info!(user_id = user.id, %username, "user logged in");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            message: "login successful",
            token,
        }),
    ))
}

/// Expires the session cookie. Issued tokens stay valid until their expiry.
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> Result<([(header::HeaderName, HeaderValue); 1], Json<MessageResponse>), ApiError> {
    let cookie = session_cookie("", 0, state.config.cookie_secure)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "logged out",
        }),
    ))
}

fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> anyhow::Result<HeaderValue> {
    let mut cookie =
        format!("{TOKEN_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).context("build session cookie")
}
