//! Valuation request data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validation::{self, ValidationErrors};

/// Reference entity: a Malaysian state or federal territory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub id: String,
    pub name: String,
    pub code: String,
}

/// Category of the property being valued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Residential,
    Commercial,
    Industrial,
}

impl PropertyType {
    pub const ALL: [PropertyType; 3] = [
        PropertyType::Residential,
        PropertyType::Commercial,
        PropertyType::Industrial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Residential => "Residential",
            PropertyType::Commercial => "Commercial",
            PropertyType::Industrial => "Industrial",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown property type '{}'", s))
    }
}

/// Lifecycle status of a valuation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RequestStatus {
    #[default]
    Draft,
    Submitted,
    Completed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 3] = [
        RequestStatus::Draft,
        RequestStatus::Submitted,
        RequestStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "Draft",
            RequestStatus::Submitted => "Submitted",
            RequestStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// A persisted valuation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRequest {
    pub id: String,
    pub property_address: String,
    pub property_type: PropertyType,
    pub state_id: String,
    pub state_name: String,
    pub purpose: String,
    pub estimated_value: f64,
    pub status: RequestStatus,
    pub requested_by_name: String,
    pub created_at: DateTime<Utc>,
}

/// Request fields as a form supplies them, before validation.
///
/// Any field may be missing. In JSON an empty string for `propertyType` or
/// `status` reads as "not selected".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestDraft {
    pub property_address: String,
    #[serde(deserialize_with = "empty_as_none")]
    pub property_type: Option<PropertyType>,
    pub state_id: String,
    pub purpose: String,
    pub estimated_value: Option<f64>,
    #[serde(deserialize_with = "empty_as_none")]
    pub status: Option<RequestStatus>,
}

impl RequestDraft {
    /// Validate the draft and convert it into a backend payload.
    pub fn into_payload(self) -> Result<CreateRequestPayload, ValidationErrors> {
        let errors = validation::validate(&self);
        match (self.property_type, self.estimated_value) {
            (Some(property_type), Some(estimated_value)) if errors.is_empty() => {
                Ok(CreateRequestPayload {
                    property_address: self.property_address,
                    property_type,
                    state_id: self.state_id,
                    purpose: self.purpose,
                    estimated_value,
                    status: self.status.unwrap_or_default(),
                })
            }
            _ => Err(errors),
        }
    }
}

/// Caller-supplied subset of a [`ValuationRequest`].
///
/// The backend stores it as given; producing one through
/// [`RequestDraft::into_payload`] is how callers get it validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestPayload {
    pub property_address: String,
    pub property_type: PropertyType,
    pub state_id: String,
    pub purpose: String,
    pub estimated_value: f64,
    #[serde(default)]
    pub status: RequestStatus,
}

impl From<CreateRequestPayload> for RequestDraft {
    fn from(payload: CreateRequestPayload) -> Self {
        Self {
            property_address: payload.property_address,
            property_type: Some(payload.property_type),
            state_id: payload.state_id,
            purpose: payload.purpose,
            estimated_value: Some(payload.estimated_value),
            status: Some(payload.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Authenticated identity plus the token minted at login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
