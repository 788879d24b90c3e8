//! Application controller: session lifecycle, loaded data and derived views
//!
//! The controller owns everything a front end shows: the current phase, the
//! loaded states and requests (most recent first), the active filters and
//! the top-level notice. Methods take `&mut self`, so at most one create can
//! be in flight per controller.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::backend::ValuationApi;
use crate::config::CoreConfig;
use crate::debounce::Debouncer;
use crate::filter::RequestFilter;
use crate::models::{
    LoginCredentials, PropertyType, RequestDraft, RequestStatus, State, User, ValuationRequest,
};
use crate::session::SessionStore;
use crate::{CoreError, CoreResult};

pub const LOGIN_FAILED_MESSAGE: &str = "Invalid email or password. Please try again.";
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load data. Please try again.";
pub const CREATE_FAILED_MESSAGE: &str = "Failed to create request. Please try again.";
pub const CREATED_MESSAGE: &str = "Valuation request created successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Unauthenticated,
    /// Logged in, fetching states and requests
    Loading,
    Ready,
    Submitting,
    /// Logged in but the last load failed; no data is held
    LoadFailed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Unauthenticated => "unauthenticated",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Submitting => "submitting",
            Phase::LoadFailed => "load failed",
        };
        f.write_str(name)
    }
}

/// Top-level message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Success(message) | Notice::Error(message) => message,
        }
    }
}

pub struct AppController<A: ValuationApi> {
    api: Arc<A>,
    sessions: Option<Arc<dyn SessionStore>>,
    config: CoreConfig,
    phase: Phase,
    user: Option<User>,
    states: Vec<State>,
    requests: Vec<ValuationRequest>,
    filter: RequestFilter,
    search_input: String,
    search: Debouncer<String>,
    notice: Option<(Notice, Option<Instant>)>,
    login_error: Option<String>,
}

impl<A: ValuationApi> AppController<A> {
    pub fn new(api: Arc<A>, config: CoreConfig) -> Self {
        Self {
            api,
            sessions: None,
            search: Debouncer::new(config.search_debounce),
            config,
            phase: Phase::Unauthenticated,
            user: None,
            states: Vec::new(),
            requests: Vec::new(),
            filter: RequestFilter::default(),
            search_input: String::new(),
            notice: None,
            login_error: None,
        }
    }

    /// Persist the session here on login and clear it on logout.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// All loaded requests, most recent first.
    pub fn requests(&self) -> &[ValuationRequest] {
        &self.requests
    }

    pub fn filter(&self) -> &RequestFilter {
        &self.filter
    }

    /// The search text as typed, which may not be applied yet.
    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    /// Current notice, unless it was transient and has expired.
    pub fn notice(&self) -> Option<&Notice> {
        match &self.notice {
            Some((_, Some(expires_at))) if Instant::now() >= *expires_at => None,
            Some((notice, _)) => Some(notice),
            None => None,
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Loaded requests that pass the active filters, most recent first.
    pub fn visible_requests(&self) -> Vec<&ValuationRequest> {
        self.filter.apply(&self.requests)
    }

    /// Authenticate, then load states and requests.
    ///
    /// A failed load after a successful login is not an error here: the
    /// controller ends in [`Phase::LoadFailed`] with an error notice.
    pub async fn login(&mut self, credentials: &LoginCredentials) -> CoreResult<()> {
        self.expect_phase("log in", &[Phase::Unauthenticated])?;
        self.login_error = None;

        let session = match self.api.login(credentials).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Login failed: {}", e);
                self.login_error = Some(LOGIN_FAILED_MESSAGE.to_string());
                return Err(e);
            }
        };

        if let Some(store) = &self.sessions {
            if let Err(e) = store.save(&session) {
                warn!("Could not persist session: {}", e);
            }
        }
        self.user = Some(session.user);
        self.load().await;
        Ok(())
    }

    /// Pick up an existing session, from the backend or the session store,
    /// and load data for it. Returns whether a session was found.
    pub async fn restore(&mut self) -> CoreResult<bool> {
        self.expect_phase("restore a session", &[Phase::Unauthenticated])?;

        if !self.api.is_authenticated() {
            let stored = match &self.sessions {
                Some(store) => store.load()?,
                None => None,
            };
            match stored {
                Some(session) => self.api.restore_session(session),
                None => return Ok(false),
            }
        }

        self.user = self.api.current_user();
        if let Some(user) = &self.user {
            info!("Resumed session for {}", user.email);
        }
        self.load().await;
        Ok(true)
    }

    /// Fetch states and requests again, e.g. after a load failure.
    pub async fn reload(&mut self) -> CoreResult<()> {
        self.expect_phase("reload", &[Phase::Ready, Phase::LoadFailed])?;
        self.load().await;
        Ok(())
    }

    async fn load(&mut self) {
        self.phase = Phase::Loading;
        if matches!(self.notice, Some((Notice::Error(_), _))) {
            self.notice = None;
        }

        let api = Arc::clone(&self.api);
        match tokio::try_join!(api.list_requests(), api.list_states()) {
            Ok((mut requests, states)) => {
                requests.reverse();
                info!("Loaded {} requests and {} states", requests.len(), states.len());
                self.requests = requests;
                self.states = states;
                self.phase = Phase::Ready;
            }
            Err(e) => {
                error!("Failed to load data: {}", e);
                self.requests.clear();
                self.states.clear();
                self.notice = Some((Notice::Error(LOAD_FAILED_MESSAGE.to_string()), None));
                self.phase = Phase::LoadFailed;
            }
        }
    }

    /// Validate a draft and, if it passes, create it through the backend.
    ///
    /// Invalid drafts come back as [`CoreError::Validation`] without any
    /// backend call. A created request is placed at the top of the list.
    pub async fn submit(&mut self, draft: RequestDraft) -> CoreResult<ValuationRequest> {
        self.expect_phase("submit a request", &[Phase::Ready])?;
        let payload = draft.into_payload()?;

        self.phase = Phase::Submitting;
        let result = self.api.create_request(payload).await;
        self.phase = Phase::Ready;

        match result {
            Ok(request) => {
                self.requests.insert(0, request.clone());
                let expires_at = Instant::now() + self.config.notice_ttl;
                self.notice = Some((Notice::Success(CREATED_MESSAGE.to_string()), Some(expires_at)));
                Ok(request)
            }
            Err(e) => {
                error!("Failed to create request: {}", e);
                self.notice = Some((Notice::Error(CREATE_FAILED_MESSAGE.to_string()), None));
                Err(e)
            }
        }
    }

    /// End the session and drop everything cached for it.
    pub fn logout(&mut self) {
        self.api.logout();
        if let Some(store) = &self.sessions {
            if let Err(e) = store.clear() {
                warn!("Could not clear stored session: {}", e);
            }
        }

        self.phase = Phase::Unauthenticated;
        self.user = None;
        self.states.clear();
        self.requests.clear();
        self.clear_filters();
        self.notice = None;
        self.login_error = None;
    }

    pub fn set_filter_property_type(&mut self, property_type: Option<PropertyType>) {
        self.filter.property_type = property_type;
    }

    pub fn set_filter_status(&mut self, status: Option<RequestStatus>) {
        self.filter.status = status;
    }

    pub fn set_filter_state(&mut self, state_id: Option<String>) {
        self.filter.state_id = state_id;
    }

    /// Record typed search text; it is applied once the input goes quiet.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search_input = term.into();
        self.search.push(self.search_input.clone());
    }

    /// Apply the typed search text if its quiet period has passed.
    /// Returns whether the applied filter changed.
    pub fn poll_search(&mut self) -> bool {
        match self.search.poll() {
            Some(term) => self.apply_search(term),
            None => false,
        }
    }

    /// Wait for the typed search text to go quiet, then apply it.
    pub async fn settle_search(&mut self) -> bool {
        match self.search.settle().await {
            Some(term) => self.apply_search(term),
            None => false,
        }
    }

    fn apply_search(&mut self, term: String) -> bool {
        let next = (!term.trim().is_empty()).then_some(term);
        let changed = self.filter.search != next;
        self.filter.search = next;
        changed
    }

    pub fn clear_filters(&mut self) {
        self.filter = RequestFilter::default();
        self.search_input.clear();
        self.search.cancel();
    }

    fn expect_phase(&self, action: &'static str, allowed: &[Phase]) -> CoreResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(CoreError::InvalidPhase {
                action,
                phase: self.phase,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockStore};
    use crate::models::{CreateRequestPayload, Session};
    use crate::session::MemorySessionStore;
    use crate::validation::Field;
    use async_trait::async_trait;
    use std::time::Duration;

    fn controller() -> AppController<MockBackend> {
        let api = MockBackend::new(Arc::new(MockStore::init()), &CoreConfig::instant());
        AppController::new(Arc::new(api), CoreConfig::instant())
    }

    fn creds() -> LoginCredentials {
        LoginCredentials::new("alice.smith@co.com", "x")
    }

    fn draft(address: &str, property_type: PropertyType) -> RequestDraft {
        RequestDraft {
            property_address: address.to_string(),
            property_type: Some(property_type),
            state_id: "3".to_string(),
            purpose: "Purchase financing".to_string(),
            estimated_value: Some(750_000.0),
            status: None,
        }
    }

    /// Backend whose reads and creates always fail
    struct BrokenApi {
        inner: MockBackend,
    }

    #[async_trait]
    impl ValuationApi for BrokenApi {
        async fn login(&self, credentials: &LoginCredentials) -> CoreResult<Session> {
            self.inner.login(credentials).await
        }
        fn logout(&self) {
            self.inner.logout()
        }
        fn is_authenticated(&self) -> bool {
            self.inner.is_authenticated()
        }
        fn current_user(&self) -> Option<User> {
            self.inner.current_user()
        }
        fn restore_session(&self, session: Session) {
            self.inner.restore_session(session)
        }
        async fn list_states(&self) -> CoreResult<Vec<State>> {
            Err(CoreError::Backend("connection reset".to_string()))
        }
        async fn list_requests(&self) -> CoreResult<Vec<ValuationRequest>> {
            self.inner.list_requests().await
        }
        async fn create_request(&self, _: CreateRequestPayload) -> CoreResult<ValuationRequest> {
            Err(CoreError::Backend("connection reset".to_string()))
        }
    }

    fn broken() -> AppController<BrokenApi> {
        let inner = MockBackend::new(Arc::new(MockStore::init()), &CoreConfig::instant());
        AppController::new(Arc::new(BrokenApi { inner }), CoreConfig::instant())
    }

    #[tokio::test]
    async fn test_login_loads_data() {
        let mut app = controller();
        assert_eq!(app.phase(), Phase::Unauthenticated);

        app.login(&creds()).await.unwrap();
        assert_eq!(app.phase(), Phase::Ready);
        assert_eq!(app.user().map(|u| u.name.as_str()), Some("alice.smith"));
        assert_eq!(app.states().len(), 16);
        assert_eq!(app.requests().len(), 2);
        // most recently stored first
        assert_eq!(app.requests()[0].id, "2");
    }

    #[tokio::test]
    async fn test_failed_login_stays_unauthenticated() {
        let mut app = controller();
        let err = app.login(&LoginCredentials::new("", "x")).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidCredentials));
        assert_eq!(app.phase(), Phase::Unauthenticated);
        assert_eq!(app.login_error(), Some(LOGIN_FAILED_MESSAGE));
        assert!(!app.api().is_authenticated());
    }

    #[tokio::test]
    async fn test_load_failure_is_distinct_from_logged_out() {
        let mut app = broken();
        app.login(&creds()).await.unwrap();
        assert_eq!(app.phase(), Phase::LoadFailed);
        assert!(app.requests().is_empty());
        assert!(app.states().is_empty());
        assert_eq!(app.notice(), Some(&Notice::Error(LOAD_FAILED_MESSAGE.to_string())));
        assert!(app.user().is_some());

        // retry is allowed and fails the same way
        app.reload().await.unwrap();
        assert_eq!(app.phase(), Phase::LoadFailed);
    }

    #[tokio::test]
    async fn test_submit_prepends_and_acknowledges() {
        let mut app = controller();
        app.login(&creds()).await.unwrap();

        let created = app
            .submit(draft("9 Jalan Tun Razak", PropertyType::Industrial))
            .await
            .unwrap();
        assert_eq!(app.phase(), Phase::Ready);
        assert_eq!(app.requests()[0], created);
        assert_eq!(created.requested_by_name, "alice.smith");
        assert_eq!(created.state_name, "Kuala Lumpur");
        assert_eq!(app.notice(), Some(&Notice::Success(CREATED_MESSAGE.to_string())));
        assert_eq!(app.api().store().requests().last(), Some(&created));
    }

    #[tokio::test]
    async fn test_invalid_submit_never_reaches_backend() {
        let mut app = controller();
        app.login(&creds()).await.unwrap();

        let mut bad = draft("9 Jalan Tun Razak", PropertyType::Residential);
        bad.estimated_value = Some(0.0);
        let err = app.submit(bad).await.unwrap_err();

        let fields = err.field_errors().unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields.contains(Field::EstimatedValue));
        assert_eq!(app.api().store().requests().len(), 2);
        assert_eq!(app.requests().len(), 2);
        assert_eq!(app.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_create_failure_surfaces_notice() {
        let mut app = broken();
        app.login(&creds()).await.unwrap();
        // force a usable phase despite the broken state listing
        app.phase = Phase::Ready;

        let err = app
            .submit(draft("1 Jalan Test", PropertyType::Residential))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Backend(_)));
        assert_eq!(app.phase(), Phase::Ready);
        assert_eq!(app.notice(), Some(&Notice::Error(CREATE_FAILED_MESSAGE.to_string())));
    }

    #[tokio::test]
    async fn test_submit_requires_login() {
        let mut app = controller();
        let err = app
            .submit(draft("1 Jalan Test", PropertyType::Residential))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidPhase {
                phase: Phase::Unauthenticated,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_notice_expires() {
        let mut app = controller();
        app.login(&creds()).await.unwrap();
        app.submit(draft("1 Jalan Test", PropertyType::Residential))
            .await
            .unwrap();
        assert!(app.notice().is_some());

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(app.notice().is_none());
    }

    #[tokio::test]
    async fn test_filters_apply_conjunctively() {
        let mut app = controller();
        app.login(&creds()).await.unwrap();

        app.set_filter_property_type(Some(PropertyType::Commercial));
        let visible: Vec<_> = app.visible_requests().iter().map(|r| r.id.clone()).collect();
        assert_eq!(visible, vec!["2"]);

        app.set_filter_status(Some(RequestStatus::Submitted));
        assert!(app.visible_requests().is_empty());

        app.clear_filters();
        assert_eq!(app.visible_requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_applies_after_quiet_period() {
        let api = MockBackend::new(Arc::new(MockStore::init()), &CoreConfig::instant());
        let mut app = AppController::new(Arc::new(api), CoreConfig::instant());
        app.login(&creds()).await.unwrap();

        app.set_search("sultan");
        assert_eq!(app.search_input(), "sultan");
        assert!(!app.poll_search());
        assert_eq!(app.visible_requests().len(), 2);

        tokio::time::advance(Duration::from_millis(300)).await;
        assert!(app.poll_search());
        let visible = app.visible_requests();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_search_coalesces_keystrokes() {
        let mut app = controller();
        app.login(&creds()).await.unwrap();

        for term in ["a", "am", "amp", "ampang"] {
            app.set_search(term);
            tokio::time::advance(Duration::from_millis(50)).await;
            assert!(!app.poll_search());
        }
        assert!(app.settle_search().await);
        assert_eq!(app.filter().search.as_deref(), Some("ampang"));
        assert_eq!(app.visible_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let mut app = controller();
        app.login(&creds()).await.unwrap();
        app.set_filter_state(Some("3".to_string()));
        app.set_search("jalan");

        app.logout();
        assert_eq!(app.phase(), Phase::Unauthenticated);
        assert!(app.requests().is_empty());
        assert!(app.states().is_empty());
        assert!(app.filter().is_empty());
        assert_eq!(app.search_input(), "");
        assert!(!app.api().is_authenticated());

        app.logout();
        assert!(!app.api().is_authenticated());
    }

    #[tokio::test]
    async fn test_session_store_roundtrip() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let backing = Arc::new(MockStore::init());

        let api = MockBackend::new(Arc::clone(&backing), &CoreConfig::instant());
        let mut first = AppController::new(Arc::new(api), CoreConfig::instant())
            .with_session_store(Arc::clone(&store));
        first.login(&creds()).await.unwrap();
        assert!(store.load().unwrap().is_some());

        // a fresh backend knows nothing until the stored session is restored
        backing.reset();
        let api = MockBackend::new(Arc::clone(&backing), &CoreConfig::instant());
        let mut second = AppController::new(Arc::new(api), CoreConfig::instant())
            .with_session_store(Arc::clone(&store));
        assert!(second.restore().await.unwrap());
        assert_eq!(second.phase(), Phase::Ready);
        assert_eq!(second.user().map(|u| u.name.as_str()), Some("alice.smith"));

        second.logout();
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_without_session() {
        let mut app = controller();
        assert!(!app.restore().await.unwrap());
        assert_eq!(app.phase(), Phase::Unauthenticated);
    }
}
