//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use store::PharmacyStore;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub open_sessions: usize,
}

/// GET /health: liveness plus the number of open terminal sessions.
pub async fn check<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        open_sessions: state.sessions.len().await,
    })
}
