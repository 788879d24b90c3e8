//! Conjunctive filtering over loaded valuation requests

use serde::{Deserialize, Serialize};

use crate::models::{PropertyType, RequestStatus, ValuationRequest};

/// Active list filters; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestFilter {
    pub property_type: Option<PropertyType>,
    pub status: Option<RequestStatus>,
    pub state_id: Option<String>,
    pub search: Option<String>,
}

impl RequestFilter {
    pub fn with_property_type(mut self, property_type: PropertyType) -> Self {
        self.property_type = Some(property_type);
        self
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_state_id(mut self, state_id: impl Into<String>) -> Self {
        self.state_id = Some(state_id.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.property_type.is_none()
            && self.status.is_none()
            && self.active_state_id().is_none()
            && self.active_search().is_none()
    }

    fn active_state_id(&self) -> Option<&str> {
        self.state_id.as_deref().filter(|id| !id.is_empty())
    }

    fn active_search(&self) -> Option<&str> {
        self.search.as_deref().filter(|term| !term.trim().is_empty())
    }

    /// True iff every active filter matches the request.
    pub fn matches(&self, request: &ValuationRequest) -> bool {
        if self.property_type.is_some_and(|t| t != request.property_type) {
            return false;
        }
        if self.status.is_some_and(|s| s != request.status) {
            return false;
        }
        if self.active_state_id().is_some_and(|id| id != request.state_id) {
            return false;
        }
        if let Some(term) = self.active_search() {
            let term = term.to_lowercase();
            if !request.property_address.to_lowercase().contains(&term) {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, requests: &'a [ValuationRequest]) -> Vec<&'a ValuationRequest> {
        requests.iter().filter(|r| self.matches(r)).collect()
    }
}
