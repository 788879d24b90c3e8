//! In-process mock of the valuation request service
//!
//! [`MockBackend`] answers the same calls a remote service would, after a
//! fixed simulated delay, out of an explicit [`MockStore`]. The store is an
//! object rather than process-global state so tests can build and reset
//! their own.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::models::{
    CreateRequestPayload, LoginCredentials, PropertyType, RequestStatus, Session, State, User,
    ValuationRequest,
};
use crate::{CoreError, CoreResult};

/// Label used for `requested_by_name` when nobody is logged in
pub const FALLBACK_REQUESTER: &str = "Current User";

/// Operations the controller needs from a valuation service.
///
/// Only `login` fails in the mock; the `Result`s on the read and create calls
/// leave room for backends that can.
#[async_trait]
pub trait ValuationApi: Send + Sync {
    /// Authenticate and make the returned session current.
    async fn login(&self, credentials: &LoginCredentials) -> CoreResult<Session>;

    /// Clear the current session. Safe to call without one.
    fn logout(&self);

    fn is_authenticated(&self) -> bool;

    fn current_user(&self) -> Option<User>;

    /// Adopt a session persisted by an earlier run.
    fn restore_session(&self, session: Session);

    async fn list_states(&self) -> CoreResult<Vec<State>>;

    /// All stored requests, oldest first.
    async fn list_requests(&self) -> CoreResult<Vec<ValuationRequest>>;

    /// Persist a new request. The payload is stored as given.
    async fn create_request(&self, payload: CreateRequestPayload) -> CoreResult<ValuationRequest>;
}

#[derive(Debug, Clone, Default)]
struct StoreData {
    states: Vec<State>,
    requests: Vec<ValuationRequest>,
    session: Option<Session>,
}

/// Process-local storage behind [`MockBackend`]
#[derive(Debug, Default)]
pub struct MockStore {
    inner: RwLock<StoreData>,
}

impl MockStore {
    /// Store seeded with the reference states and two sample requests.
    pub fn init() -> Self {
        Self {
            inner: RwLock::new(seeded()),
        }
    }

    /// Store with the reference states but no requests.
    pub fn empty() -> Self {
        Self {
            inner: RwLock::new(StoreData {
                states: reference_states(),
                ..StoreData::default()
            }),
        }
    }

    /// Return to the seeded contents and drop any session.
    pub fn reset(&self) {
        *self.inner.write() = seeded();
    }

    pub fn states(&self) -> Vec<State> {
        self.inner.read().states.clone()
    }

    pub fn requests(&self) -> Vec<ValuationRequest> {
        self.inner.read().requests.clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.read().session.clone()
    }

    fn set_session(&self, session: Option<Session>) {
        self.inner.write().session = session;
    }

    fn state_name(&self, state_id: &str) -> String {
        self.inner
            .read()
            .states
            .iter()
            .find(|s| s.id == state_id)
            .map(|s| s.name.clone())
            .unwrap_or_default()
    }

    fn push(&self, request: ValuationRequest) {
        self.inner.write().requests.push(request);
    }
}

/// Mock service with simulated network latency
#[derive(Debug, Clone)]
pub struct MockBackend {
    store: Arc<MockStore>,
    latency: Duration,
    login_latency: Duration,
}

impl MockBackend {
    pub fn new(store: Arc<MockStore>, config: &CoreConfig) -> Self {
        Self {
            store,
            latency: config.latency,
            login_latency: config.login_latency,
        }
    }

    /// Seeded store with default latencies.
    pub fn seeded() -> Self {
        Self::new(Arc::new(MockStore::init()), &CoreConfig::default())
    }

    pub fn store(&self) -> &Arc<MockStore> {
        &self.store
    }

    async fn simulate(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ValuationApi for MockBackend {
    async fn login(&self, credentials: &LoginCredentials) -> CoreResult<Session> {
        Self::simulate(self.login_latency).await;

        // Demo stub: any non-empty pair is accepted
        if credentials.email.is_empty() || credentials.password.is_empty() {
            warn!("Rejected login with missing credentials");
            return Err(CoreError::InvalidCredentials);
        }

        let name = credentials
            .email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string();
        let session = Session {
            token: mint_id("token"),
            user: User {
                id: mint_id("user"),
                name,
                email: credentials.email.clone(),
            },
        };
        self.store.set_session(Some(session.clone()));

        info!("User {} logged in", session.user.email);
        Ok(session)
    }

    fn logout(&self) {
        if let Some(session) = self.store.session() {
            info!("User {} logged out", session.user.email);
        }
        self.store.set_session(None);
    }

    fn is_authenticated(&self) -> bool {
        self.store.session().is_some()
    }

    fn current_user(&self) -> Option<User> {
        self.store.session().map(|s| s.user)
    }

    fn restore_session(&self, session: Session) {
        debug!("Restoring session for {}", session.user.email);
        self.store.set_session(Some(session));
    }

    async fn list_states(&self) -> CoreResult<Vec<State>> {
        Self::simulate(self.latency).await;
        Ok(self.store.states())
    }

    async fn list_requests(&self) -> CoreResult<Vec<ValuationRequest>> {
        Self::simulate(self.latency).await;
        Ok(self.store.requests())
    }

    async fn create_request(&self, payload: CreateRequestPayload) -> CoreResult<ValuationRequest> {
        Self::simulate(self.latency).await;

        let requested_by_name = self
            .current_user()
            .map(|u| u.name)
            .unwrap_or_else(|| FALLBACK_REQUESTER.to_string());

        let request = ValuationRequest {
            id: mint_id("REQ"),
            state_name: self.store.state_name(&payload.state_id),
            property_address: payload.property_address,
            property_type: payload.property_type,
            state_id: payload.state_id,
            purpose: payload.purpose,
            estimated_value: payload.estimated_value,
            status: payload.status,
            requested_by_name,
            created_at: Utc::now(),
        };
        self.store.push(request.clone());

        info!("Created valuation request {} ({})", request.id, request.property_type);
        Ok(request)
    }
}

/// `<prefix>-<unix millis>-<random>`; the random part keeps ids unique
/// within the same millisecond.
fn mint_id(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

/// The fixed reference set of Malaysian states and federal territories.
pub fn reference_states() -> Vec<State> {
    [
        ("1", "Johor", "JHR"),
        ("2", "Kedah", "KDH"),
        ("3", "Kuala Lumpur", "KUL"),
        ("4", "Kelantan", "KTN"),
        ("5", "Labuan", "LBN"),
        ("6", "Melaka", "MLK"),
        ("7", "Negeri Sembilan", "NSN"),
        ("8", "Pahang", "PHG"),
        ("9", "Penang", "PNG"),
        ("10", "Perak", "PRK"),
        ("11", "Perlis", "PLS"),
        ("12", "Putrajaya", "PJY"),
        ("13", "Sabah", "SBH"),
        ("14", "Sarawak", "SWK"),
        ("15", "Selangor", "SLG"),
        ("16", "Terengganu", "TRG"),
    ]
    .into_iter()
    .map(|(id, name, code)| State {
        id: id.to_string(),
        name: name.to_string(),
        code: code.to_string(),
    })
    .collect()
}

fn seeded() -> StoreData {
    let sample = |id: &str,
                  address: &str,
                  property_type: PropertyType,
                  purpose: &str,
                  value: f64,
                  status: RequestStatus,
                  by: &str,
                  created: (u32, u32, u32, u32)| ValuationRequest {
        id: id.to_string(),
        property_address: address.to_string(),
        property_type,
        state_id: "3".to_string(),
        state_name: "Kuala Lumpur".to_string(),
        purpose: purpose.to_string(),
        estimated_value: value,
        status,
        requested_by_name: by.to_string(),
        created_at: Utc
            .with_ymd_and_hms(2026, created.0, created.1, created.2, created.3, 0)
            .single()
            .unwrap_or_default(),
    };

    StoreData {
        states: reference_states(),
        requests: vec![
            sample(
                "1",
                "123 Jalan Ampang, Kuala Lumpur",
                PropertyType::Residential,
                "Purchase financing",
                850_000.0,
                RequestStatus::Submitted,
                "John Tan",
                (1, 15, 10, 30),
            ),
            sample(
                "2",
                "45 Jalan Sultan Ismail, Kuala Lumpur",
                PropertyType::Commercial,
                "Refinancing",
                2_500_000.0,
                RequestStatus::Completed,
                "Sarah Lee",
                (1, 10, 14, 20),
            ),
        ],
        session: None,
    }
}
