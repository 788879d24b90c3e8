//! Valuation Request API Server

mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vr_core::{CoreConfig, CoreResult, MockBackend, MockStore};

/// Application state shared across handlers
pub struct AppState {
    pub backend: MockBackend,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let backend = MockBackend::new(Arc::new(MockStore::init()), &config.core);
        Self { backend, config }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub core: CoreConfig,
}

impl AppConfig {
    pub fn from_env() -> CoreResult<Self> {
        Ok(Self {
            bind_addr: std::env::var("VR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            core: CoreConfig::from_env()?,
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        // Authentication
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        // Reference data
        .route("/api/states", get(routes::states::list_states))
        // Requests
        .route(
            "/api/requests",
            get(routes::requests::list_requests).post(routes::requests::create_request),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "vr_api=debug,vr_core=info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> CoreResult<()> {
    info!("Starting Valuation Request API Server");

    let state = Arc::new(AppState::new(AppConfig::from_env()?));
    let addr = state.config.bind_addr.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
