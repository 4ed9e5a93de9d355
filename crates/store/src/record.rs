//! Typed records exchanged with the persistence collaborator.

use chrono::{DateTime, NaiveDate, Utc};
use common::{BatchId, CustomerId, InvoiceId, InvoiceLineId, Money, ProductId, StockRecordId};
use serde::{Deserialize, Serialize};

/// A catalog product joined with its batches and their stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Generic / active-ingredient name.
    pub generic_name: Option<String>,
    pub strength: Option<String>,
    pub list_price: Money,
    /// Names of ingredients this product is known to interact with.
    pub interactions: Vec<String>,
    pub batches: Vec<BatchStock>,
}

impl Product {
    /// Returns the batch with the given id, if it belongs to this product.
    pub fn batch(&self, batch_id: BatchId) -> Option<&BatchStock> {
        self.batches.iter().find(|b| b.batch.id == batch_id)
    }

    /// Returns true if `candidate` names this product, by display or generic name.
    pub fn is_named(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        self.name.trim().eq_ignore_ascii_case(candidate)
            || self
                .generic_name
                .as_deref()
                .is_some_and(|g| g.trim().eq_ignore_ascii_case(candidate))
    }

    /// Total units on hand across all batches.
    pub fn total_stock(&self) -> u64 {
        self.batches.iter().map(|b| b.stock.quantity as u64).sum()
    }
}

/// A dated, priced lot of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub product_id: ProductId,
    pub batch_number: String,
    pub expiry: NaiveDate,
    pub sale_price: Money,
    pub cost_price: Money,
}

impl Batch {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry < today
    }
}

/// Quantity on hand for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: StockRecordId,
    pub batch_id: BatchId,
    pub quantity: u32,
}

/// A batch together with its single stock record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStock {
    pub batch: Batch,
    pub stock: StockRecord,
}

impl BatchStock {
    pub fn quantity(&self) -> u32 {
        self.stock.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Invoice lifecycle marker. Invoices are append-only, so this never changes
/// after insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Completed,
    Refunded,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Completed => "COMPLETED",
            InvoiceStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "COMPLETED" => Some(InvoiceStatus::Completed),
            "REFUNDED" => Some(InvoiceStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub total: Money,
    pub amount_paid: Money,
    pub customer_id: Option<CustomerId>,
    pub status: InvoiceStatus,
    /// For refund invoices, the invoice being refunded.
    pub refund_of: Option<InvoiceId>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an invoice. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub total: Money,
    pub amount_paid: Money,
    pub customer_id: Option<CustomerId>,
    pub status: InvoiceStatus,
    pub refund_of: Option<InvoiceId>,
}

impl NewInvoice {
    /// A completed sale paid in full.
    pub fn completed(total: Money, customer_id: Option<CustomerId>) -> Self {
        Self {
            total,
            amount_paid: total,
            customer_id,
            status: InvoiceStatus::Completed,
            refund_of: None,
        }
    }

    /// A refund of `amount` against `original`; stored with a negative total.
    pub fn refund(original: &Invoice, amount: Money) -> Self {
        let total = amount.negate();
        Self {
            total,
            amount_paid: total,
            customer_id: original.customer_id,
            status: InvoiceStatus::Refunded,
            refund_of: Some(original.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: InvoiceLineId,
    pub invoice_id: InvoiceId,
    pub batch_id: BatchId,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoiceLine {
    pub invoice_id: InvoiceId,
    pub batch_id: BatchId,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl NewInvoiceLine {
    /// A sale line; the total is quantity times unit price.
    pub fn sale(invoice_id: InvoiceId, batch_id: BatchId, quantity: u32, unit_price: Money) -> Self {
        Self {
            invoice_id,
            batch_id,
            quantity,
            unit_price,
            line_total: unit_price.multiply(quantity),
        }
    }

    /// A refund line; same shape as a sale line with the total negated.
    pub fn refund(
        invoice_id: InvoiceId,
        batch_id: BatchId,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            line_total: unit_price.multiply(quantity).negate(),
            ..Self::sale(invoice_id, batch_id, quantity, unit_price)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, generic: Option<&str>) -> Product {
        Product {
            id: ProductId::new(),
            name: name.to_string(),
            generic_name: generic.map(str::to_string),
            strength: None,
            list_price: Money::from_cents(100),
            interactions: vec![],
            batches: vec![],
        }
    }

    #[test]
    fn is_named_matches_display_and_generic_names() {
        let p = product("Panadol", Some("Paracetamol"));
        assert!(p.is_named("panadol"));
        assert!(p.is_named(" PARACETAMOL "));
        assert!(!p.is_named("Ibuprofen"));
    }

    #[test]
    fn sale_line_total_is_quantity_times_price() {
        let line = NewInvoiceLine::sale(InvoiceId::new(), BatchId::new(), 3, Money::from_cents(500));
        assert_eq!(line.line_total, Money::from_cents(1500));
    }

    #[test]
    fn refund_invoice_carries_negative_total() {
        let original = Invoice {
            id: InvoiceId::new(),
            total: Money::from_cents(1900),
            amount_paid: Money::from_cents(1900),
            customer_id: None,
            status: InvoiceStatus::Completed,
            refund_of: None,
            created_at: Utc::now(),
        };
        let refund = NewInvoice::refund(&original, Money::from_cents(500));
        assert_eq!(refund.total, Money::from_cents(-500));
        assert_eq!(refund.status, InvoiceStatus::Refunded);
        assert_eq!(refund.refund_of, Some(original.id));
    }

    #[test]
    fn status_uses_upper_case_wire_names() {
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::Refunded).unwrap(),
            "\"REFUNDED\""
        );
        assert_eq!(InvoiceStatus::parse("COMPLETED"), Some(InvoiceStatus::Completed));
        assert_eq!(InvoiceStatus::parse("VOID"), None);
    }
}
