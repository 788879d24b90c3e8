//! Field validation for valuation request drafts and login input
//!
//! Every rule is independent: a draft may fail several fields at once, and
//! an empty [`ValidationErrors`] means the draft may be submitted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{LoginCredentials, RequestDraft};

pub const MAX_ADDRESS_LEN: usize = 500;
pub const MAX_PURPOSE_LEN: usize = 200;

/// Form field a validation message is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    PropertyAddress,
    PropertyType,
    StateId,
    Purpose,
    EstimatedValue,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::PropertyAddress => "propertyAddress",
            Field::PropertyType => "propertyType",
            Field::StateId => "stateId",
            Field::Purpose => "purpose",
            Field::EstimatedValue => "estimatedValue",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name to human-readable message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// Drop the message for a field, e.g. once the user edits it again.
    pub fn remove(&mut self, field: Field) -> Option<String> {
        self.0.remove(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Check a draft against the field rules.
pub fn validate(draft: &RequestDraft) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    if draft.property_address.trim().is_empty() {
        errors.insert(Field::PropertyAddress, "Property address is required");
    } else if draft.property_address.chars().count() > MAX_ADDRESS_LEN {
        errors.insert(
            Field::PropertyAddress,
            format!("Property address must not exceed {} characters", MAX_ADDRESS_LEN),
        );
    }

    if draft.property_type.is_none() {
        errors.insert(Field::PropertyType, "Property type is required");
    }

    if draft.state_id.is_empty() {
        errors.insert(Field::StateId, "State is required");
    }

    if draft.purpose.trim().is_empty() {
        errors.insert(Field::Purpose, "Purpose is required");
    } else if draft.purpose.chars().count() > MAX_PURPOSE_LEN {
        errors.insert(
            Field::Purpose,
            format!("Purpose must not exceed {} characters", MAX_PURPOSE_LEN),
        );
    }

    // NaN compares false, so it fails along with zero and negatives
    if !draft.estimated_value.is_some_and(|v| v > 0.0) {
        errors.insert(Field::EstimatedValue, "Estimated value must be greater than 0");
    }

    errors
}

/// Client-side precheck run before credentials are sent to the backend.
pub fn validate_login(credentials: &LoginCredentials) -> Result<(), &'static str> {
    if credentials.email.is_empty() || credentials.password.is_empty() {
        return Err("Email and password are required");
    }
    if !credentials.email.contains('@') {
        return Err("Please enter a valid email address");
    }
    Ok(())
}
