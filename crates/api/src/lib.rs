//! HTTP API server for the pharmacy point of sale.
//!
//! Provides REST endpoints for catalog lookup, terminal sessions, checkout,
//! refunds and the manager dashboard, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{InMemoryStore, PharmacyStore, PostgresStore, StoreError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: PharmacyStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/products", get(routes::catalog::products::<S>))
        .route("/customers", get(routes::catalog::customers::<S>))
        .route("/sessions", post(routes::sessions::open::<S>))
        .route(
            "/sessions/{id}",
            get(routes::sessions::get::<S>).delete(routes::sessions::close::<S>),
        )
        .route("/sessions/{id}/lines", post(routes::sessions::add_line::<S>))
        .route(
            "/sessions/{id}/lines/{batch_id}",
            delete(routes::sessions::remove_line::<S>),
        )
        .route(
            "/sessions/{id}/customer",
            put(routes::sessions::select_customer::<S>)
                .delete(routes::sessions::clear_customer::<S>),
        )
        .route("/sessions/{id}/checkout", post(routes::sessions::checkout::<S>))
        .route("/invoices/{id}", get(routes::invoices::get::<S>))
        .route("/invoice-lines/{id}/refund", post(routes::invoices::refund::<S>))
        .route("/dashboard", get(routes::dashboard::summary::<S>))
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

/// Creates application state over any store.
pub fn create_state<S: PharmacyStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, config))
}

/// Spawns the background task that evicts sessions idle for `idle_for`.
pub fn spawn_session_reaper<S: PharmacyStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    idle_for: Duration,
) -> tokio::task::JoinHandle<()> {
    let period = idle_for.clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = state.sessions.evict_idle(Instant::now(), idle_for).await;
            if evicted > 0 {
                tracing::info!(evicted, "evicted idle sessions");
            }
        }
    })
}

/// Connects to Postgres and applies pending migrations.
pub async fn connect_postgres(url: &str, config: &Config) -> Result<PostgresStore, StoreError> {
    let store = PostgresStore::connect(url, config.database_max_connections).await?;
    store.run_migrations().await?;
    Ok(store)
}

/// Builds the in-memory store, seeded from `SEED_FILE` when one is configured.
pub async fn load_memory_store(config: &Config) -> Result<InMemoryStore, StoreError> {
    let Some(path) = &config.seed_file else {
        tracing::warn!("no SEED_FILE configured, starting with an empty catalog");
        return Ok(InMemoryStore::new());
    };

    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::Unavailable(format!("reading {}: {e}", path.display())))?;
    InMemoryStore::from_fixture_json(&json)
}
