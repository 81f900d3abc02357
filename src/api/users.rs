use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::server::AppState;
use crate::db::models::User;

/// Body of `POST /users` and `PUT /users/{id}`.
///
/// Both fields are optional on the wire; a missing username is left for the
/// table's NOT NULL constraint to reject.
#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub username: Option<String>,
    pub bio: Option<String>,
}

fn found_or_404(user: Option<User>) -> Response {
    match user {
        Some(user) => Json(user).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /users
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.find().await?;
    Ok(Json(users))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user = state.users.find_by_id(id).await?;
    Ok(found_or_404(user))
}

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .users
        .insert(payload.username.as_deref(), payload.bio.as_deref())
        .await?;
    Ok(Json(user))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(payload): Json<UserPayload>,
) -> Result<Response, ApiError> {
    let user = state
        .users
        .update(id, payload.username.as_deref(), payload.bio.as_deref())
        .await?;
    Ok(found_or_404(user))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let user = state.users.delete(id).await?;
    Ok(found_or_404(user))
}
