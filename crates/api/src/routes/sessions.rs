//! Terminal session endpoints: cart editing, customer selection and checkout.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use checkout::Receipt;
use common::{BatchId, CustomerId, Money, ProductId, SessionId};
use domain::{AddLineOutcome, CartLine, Notice, NotificationSink, Session, TracingSink};
use serde::{Deserialize, Serialize};
use store::{Customer, PharmacyStore};
use tokio::sync::Mutex;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddLineRequest {
    pub product_id: ProductId,
    pub batch_id: BatchId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Set when the operator has acknowledged the advisories.
    #[serde(default)]
    pub confirm: bool,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct SelectCustomerRequest {
    pub customer_id: CustomerId,
}

// -- Response types --

#[derive(Serialize)]
pub struct SessionResponse {
    pub id: SessionId,
    pub opened_at: DateTime<Utc>,
    pub customer: Option<Customer>,
    pub customer_label: String,
    pub lines: Vec<LineResponse>,
    pub total_quantity: u32,
    pub total: Money,
}

#[derive(Serialize)]
pub struct LineResponse {
    #[serde(flatten)]
    pub line: CartLine,
    pub line_total: Money,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        let cart = session.cart();
        Self {
            id: session.id(),
            opened_at: session.opened_at(),
            customer: session.customer().cloned(),
            customer_label: session.customer_label().to_string(),
            lines: cart
                .lines()
                .iter()
                .map(|line| LineResponse {
                    line_total: line.line_total(),
                    line: line.clone(),
                })
                .collect(),
            total_quantity: cart.total_quantity(),
            total: cart.total(),
        }
    }
}

#[derive(Serialize)]
pub struct AddLineResponse {
    pub outcome: AddLineOutcome,
    pub notices: Vec<Notice>,
    pub session: SessionResponse,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub invoice_number: String,
    pub receipt: Receipt,
    /// The printable slip.
    pub receipt_text: String,
}

// -- Handlers --

/// POST /sessions: open a new terminal session.
#[tracing::instrument(skip(state))]
pub async fn open<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.sessions.open().await;
    tracing::info!(session_id = %session.id(), "session opened");
    (StatusCode::CREATED, Json(SessionResponse::from(&session)))
}

/// GET /sessions/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(SessionResponse::from(&*session)))
}

/// DELETE /sessions/{id}: close the session, discarding its cart.
#[tracing::instrument(skip(state))]
pub async fn close<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id: SessionId = parse_id("session", &id)?;
    if !state.sessions.close(session_id).await {
        return Err(session_not_found(&id));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sessions/{id}/lines: add a product batch to the cart.
///
/// Responds 409 with the advisories when the operator has to confirm first.
#[tracing::instrument(skip(state, req), fields(product_id = %req.product_id, batch_id = %req.batch_id))]
pub async fn add_line<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AddLineRequest>,
) -> Result<(StatusCode, Json<AddLineResponse>), ApiError> {
    let session = find(&state, &id).await?;
    // Read through to the store so stock and expiry are current.
    let product = state.catalog.locate(req.product_id, req.batch_id).await?;
    let today = Utc::now().date_naive();

    let mut session = session.lock().await;
    let result = session.add_line(&product, req.batch_id, req.quantity, today, req.confirm);

    let notices = Notice::for_add_line(&result);
    TracingSink.notify_all(notices.clone());
    let outcome = result?;

    let status = match outcome {
        AddLineOutcome::ConfirmationRequired { .. } => StatusCode::CONFLICT,
        _ => StatusCode::OK,
    };
    Ok((
        status,
        Json(AddLineResponse {
            outcome,
            notices,
            session: SessionResponse::from(&*session),
        }),
    ))
}

/// DELETE /sessions/{id}/lines/{batch_id}
#[tracing::instrument(skip(state))]
pub async fn remove_line<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, batch_id)): Path<(String, String)>,
) -> Result<Json<SessionResponse>, ApiError> {
    let batch_id: BatchId = parse_id("batch", &batch_id)?;
    let session = find(&state, &id).await?;
    let mut session = session.lock().await;

    if session.cart().line(batch_id).is_none() {
        return Err(ApiError::NotFound(format!("No cart line for batch {batch_id}")));
    }
    session.remove_line(batch_id);
    Ok(Json(SessionResponse::from(&*session)))
}

/// PUT /sessions/{id}/customer
#[tracing::instrument(skip(state, req), fields(customer_id = %req.customer_id))]
pub async fn select_customer<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<SelectCustomerRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find(&state, &id).await?;
    let customer = state.catalog.customer(req.customer_id).await?;

    let mut session = session.lock().await;
    session.select_customer(customer);
    Ok(Json(SessionResponse::from(&*session)))
}

/// DELETE /sessions/{id}/customer: back to walk-in.
#[tracing::instrument(skip(state))]
pub async fn clear_customer<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = find(&state, &id).await?;
    let mut session = session.lock().await;
    session.clear_customer();
    Ok(Json(SessionResponse::from(&*session)))
}

/// POST /sessions/{id}/checkout: commit the cart and return the receipt.
///
/// The session lock is held across the whole commit so the cart cannot
/// change underneath it.
#[tracing::instrument(skip(state))]
pub async fn checkout<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let session = find(&state, &id).await?;
    let mut session = session.lock().await;

    let receipt = state.coordinator.execute(&mut session).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            invoice_number: receipt.short_id(),
            receipt_text: receipt.render(&state.receipt_header),
            receipt,
        }),
    ))
}

async fn find<S: PharmacyStore + Clone + 'static>(
    state: &AppState<S>,
    id: &str,
) -> Result<Arc<Mutex<Session>>, ApiError> {
    let session_id = parse_id("session", id)?;
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(id))
}

fn session_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Session {id} not found"))
}
