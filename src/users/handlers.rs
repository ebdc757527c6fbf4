use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{normalize_email, normalize_username, NewUserRequest, PublicUser, UpdateUserRequest},
    repo_types::UserChanges,
    services,
};
use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/me", get(get_me))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("user not found".into())
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = state.store.list().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser { username: actor, .. }: AuthUser,
    payload: Result<Json<NewUserRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, ApiError> {
    let Json(payload) = payload?;
    let user = services::create_user(&state, payload).await?;
    info!(%actor, user_id = user.id, "user created via api");
    Ok(Json(user.into()))
}

#[instrument(skip(state, id))]
pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PublicUser>, ApiError> {
    let Path(id) = id?;
    let user = state.store.find_by_id(id).await?.ok_or_else(not_found)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, id, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser { username: actor, .. }: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let changes = UserChanges {
        username: normalize_username(&payload.username)?,
        email: normalize_email(payload.email)?,
    };

    let user = state
        .store
        .update(id, changes)
        .await?
        .ok_or_else(not_found)?;

    info!(%actor, user_id = id, "user updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, id))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser { username: actor, .. }: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    if !state.store.delete(id).await? {
        return Err(not_found());
    }
    info!(%actor, user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser { id, username }: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state
        .store
        .find_by_id(id)
        .await?
        .filter(|user| user.username == username)
        .ok_or_else(|| {
            warn!(user_id = id, %username, "token subject no longer exists");
            not_found()
        })?;
    Ok(Json(user.into()))
}
