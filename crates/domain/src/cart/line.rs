use chrono::NaiveDate;
use common::{BatchId, Money, ProductId};
use serde::{Deserialize, Serialize};
use store::{BatchStock, Product};

/// One batch of one product in the cart.
///
/// The unit price is copied from the batch when the line is created and
/// stays frozen for the rest of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub generic_name: Option<String>,
    /// Interacting ingredient names declared by the product.
    pub interactions: Vec<String>,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub expiry: NaiveDate,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartLine {
    /// Snapshots a product batch as a new line.
    pub fn new(product: &Product, batch: &BatchStock, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            generic_name: product.generic_name.clone(),
            interactions: product.interactions.clone(),
            batch_id: batch.batch.id,
            batch_number: batch.batch.batch_number.clone(),
            expiry: batch.batch.expiry,
            unit_price: batch.batch.sale_price,
            quantity,
        }
    }

    /// Returns unit price times quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }

    /// Returns true if `candidate` names this line's product, by display or generic name.
    pub fn is_named(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        self.product_name.trim().eq_ignore_ascii_case(candidate)
            || self
                .generic_name
                .as_deref()
                .is_some_and(|g| g.trim().eq_ignore_ascii_case(candidate))
    }
}
