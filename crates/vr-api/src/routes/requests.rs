//! Valuation request routes

use crate::routes::ApiError;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use vr_core::{RequestDraft, RequestFilter, ValuationApi, ValuationRequest};

/// Query string filters; empty values are ignored
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub property_type: Option<String>,
    pub status: Option<String>,
    pub state_id: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<RequestFilter, ApiError> {
        Ok(RequestFilter {
            property_type: parse_opt(self.property_type)?,
            status: parse_opt(self.status)?,
            state_id: self.state_id.filter(|id| !id.is_empty()),
            search: self.search.filter(|term| !term.trim().is_empty()),
        })
    }
}

fn parse_opt<T: FromStr<Err = String>>(raw: Option<String>) -> Result<Option<T>, ApiError> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(ApiError::BadRequest),
    }
}

pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ValuationRequest>>, ApiError> {
    let filter = query.into_filter()?;
    let requests = state.backend.list_requests().await?;
    let visible: Vec<ValuationRequest> = filter.apply(&requests).into_iter().cloned().collect();

    debug!("Listing {} of {} requests", visible.len(), requests.len());
    Ok(Json(visible))
}

pub async fn create_request(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<RequestDraft>,
) -> Result<(StatusCode, Json<ValuationRequest>), ApiError> {
    let payload = draft.into_payload().map_err(ApiError::Validation)?;
    let created = state.backend.create_request(payload).await?;

    Ok((StatusCode::CREATED, Json(created)))
}
