//! Cart aggregate and related types.

mod advisory;
mod aggregate;
mod events;
mod line;

pub use advisory::Advisory;
pub use aggregate::{AddLine, Cart};
pub use events::{CartEvent, LineQuantityIncreasedData, LineRemovedData};
pub use line::CartLine;

use chrono::NaiveDate;
use common::{BatchId, ProductId};
use thiserror::Error;

/// Errors that block a cart change. The cart is never mutated when one is returned.
///
/// Display strings are the operator-facing messages shown at the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Requested quantity was zero.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// The batch does not belong to the product.
    #[error("Batch {batch_id} does not belong to product {product_id}")]
    UnknownBatch {
        product_id: ProductId,
        batch_id: BatchId,
    },

    /// No units on hand for the batch.
    #[error("Out of Stock!")]
    OutOfStock { product: String },

    /// The batch expired before today.
    #[error("EXPIRED ITEM! (Exp: {expiry})")]
    Expired { product: String, expiry: NaiveDate },

    /// The resulting line quantity would exceed stock on hand.
    #[error("Stock limit reached!")]
    StockLimitExceeded {
        product: String,
        requested: u32,
        available: u32,
    },
}
