//! Entry points for the job pipeline.
//!
//! Provides REST endpoints and a serverless invocation adapter that validate
//! submissions and hand them to the dispatch bus, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod invocation;
pub mod request;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use bus::BusError;
use jobs::{Analyzer, InMemoryAnalyzer};
use metrics_exporter_prometheus::PrometheusHandle;
use store::InMemoryStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use invocation::{InvocationResponse, invoke};
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::ops::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::ops::health))
        .route("/jobs", post(routes::jobs::create))
        .route("/jobs/{id}", get(routes::jobs::get))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the given store and analyzer.
pub fn create_state(
    store: InMemoryStore,
    analyzer: Arc<dyn Analyzer>,
    config: Config,
) -> Result<Arc<AppState>, BusError> {
    let bus = jobs::build_bus(&store, analyzer)?;
    Ok(Arc::new(AppState::new(bus, Arc::new(store), config)))
}

/// Creates the default application state with an in-memory store and analyzer.
pub fn create_default_state(config: Config) -> Result<Arc<AppState>, BusError> {
    create_state(
        InMemoryStore::new(),
        Arc::new(InMemoryAnalyzer::new()),
        config,
    )
}
