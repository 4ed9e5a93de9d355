//! Checkout and refund error types.

use common::{BatchId, InvoiceId, InvoiceLineId};
use store::{InvoiceStatus, StoreError};
use thiserror::Error;

/// Errors that can occur during checkout.
///
/// Every variant except `CompensationFailed` leaves the store as if the
/// checkout never started, and the cart is always left intact for retry.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty!")]
    EmptyCart,

    /// The guarded stock decrement found fewer units than the line needs.
    #[error("Insufficient stock for {product} (batch {batch_id}): requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        batch_id: BatchId,
        requested: u32,
        available: u32,
    },

    /// A write failed; everything written before it was undone.
    #[error("Checkout Failed: {step}: {source}")]
    CheckoutFailed {
        step: &'static str,
        #[source]
        source: StoreError,
    },

    /// Undoing a partial checkout failed, so some writes may remain.
    #[error("Compensation step '{step}' failed after checkout error ({cause}): {source}")]
    CompensationFailed {
        step: &'static str,
        cause: String,
        #[source]
        source: StoreError,
    },
}

impl CheckoutError {
    /// True when the underlying store could not be reached.
    pub fn is_unavailable(&self) -> bool {
        match self {
            CheckoutError::CheckoutFailed { source, .. }
            | CheckoutError::CompensationFailed { source, .. } => source.is_unavailable(),
            _ => false,
        }
    }
}

/// Errors that can occur while refunding an invoice line.
#[derive(Debug, Error)]
pub enum RefundError {
    #[error("Refund quantity must be at least 1")]
    InvalidQuantity,

    #[error("Invoice line not found: {0}")]
    LineNotFound(InvoiceLineId),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Only completed sales can be refunded.
    #[error("Invoice {invoice_id} is {status} and cannot be refunded")]
    NotRefundable {
        invoice_id: InvoiceId,
        status: InvoiceStatus,
    },

    #[error("Cannot refund {requested} units: only {remaining} left on the line")]
    ExceedsRefundable { requested: u32, remaining: u32 },

    #[error("Refund failed: {step}: {source}")]
    RefundFailed {
        step: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Compensation step '{step}' failed after refund error ({cause}): {source}")]
    CompensationFailed {
        step: &'static str,
        cause: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
