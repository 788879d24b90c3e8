//! Valuation Request Core
//!
//! This crate provides the pieces behind the property valuation request
//! workflow: field validation, list filtering, an in-memory mock backend
//! with simulated latency, session persistence and the application
//! controller that ties them together.

pub mod backend;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod display;
pub mod filter;
pub mod models;
pub mod session;
pub mod validation;

use thiserror::Error;

pub use backend::{MockBackend, MockStore, ValuationApi};
pub use config::CoreConfig;
pub use controller::{AppController, Notice, Phase};
pub use debounce::Debouncer;
pub use filter::RequestFilter;
pub use models::{
    CreateRequestPayload, LoginCredentials, PropertyType, RequestDraft, RequestStatus, Session,
    State, User, ValuationRequest,
};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use validation::{validate, Field, ValidationErrors};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Cannot {action} while {phase}")]
    InvalidPhase { action: &'static str, phase: Phase },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Field errors the user can fix inline, as opposed to top-level failures.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            CoreError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        CoreError::Validation(errors)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
