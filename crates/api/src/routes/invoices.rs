//! Invoice lookup and refund endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::Refund;
use common::{InvoiceId, InvoiceLineId};
use serde::{Deserialize, Serialize};
use store::{Invoice, InvoiceLine, PharmacyStore};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RefundRequest {
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct InvoiceResponse {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
    /// Refund invoices issued against this one.
    pub refunds: Vec<Invoice>,
}

/// GET /invoices/{id}: an invoice with its lines and refunds.
#[tracing::instrument(skip(state))]
pub async fn get<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice_id: InvoiceId = parse_id("invoice", &id)?;
    let store = state.catalog.store();

    let invoice = store
        .fetch_invoice(invoice_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Invoice {id} not found")))?;
    let lines = store.fetch_invoice_lines(invoice_id).await?;
    let refunds = store.fetch_refunds(invoice_id).await?;

    Ok(Json(InvoiceResponse {
        invoice,
        lines,
        refunds,
    }))
}

/// POST /invoice-lines/{id}/refund: refund units of a sold line.
#[tracing::instrument(skip(state, req), fields(quantity = req.quantity))]
pub async fn refund<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<RefundRequest>,
) -> Result<(StatusCode, Json<Refund>), ApiError> {
    let line_id: InvoiceLineId = parse_id("invoice line", &id)?;
    let refund = state.refunds.refund(line_id, req.quantity).await?;
    Ok((StatusCode::CREATED, Json(refund)))
}
