//! Authentication routes

use crate::routes::ApiError;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use vr_core::{LoginCredentials, User, ValuationApi};

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state.backend.login(&credentials).await?;

    Ok(Json(LoginResponse {
        token: session.token,
        user: session.user,
    }))
}

pub async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.backend.logout();
    StatusCode::NO_CONTENT
}

pub async fn me(State(state): State<Arc<AppState>>) -> Result<Json<User>, ApiError> {
    state
        .backend
        .current_user()
        .map(Json)
        .ok_or(ApiError::Unauthorized("Not logged in"))
}
