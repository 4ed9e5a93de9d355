//! Manager dashboard endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{NaiveDate, Utc};
use domain::DashboardSummary;
use serde::Deserialize;
use store::PharmacyStore;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// UTC day to summarise; defaults to today.
    pub date: Option<NaiveDate>,
}

/// GET /dashboard?date= : revenue, transaction count and low-stock warnings.
#[tracing::instrument(skip(state))]
pub async fn summary<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.dashboard.summary(date).await?))
}
