//! Reference data routes

use crate::routes::ApiError;
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;
use vr_core::{models, ValuationApi};

pub async fn list_states(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<models::State>>, ApiError> {
    Ok(Json(state.backend.list_states().await?))
}
