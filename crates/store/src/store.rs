use async_trait::async_trait;
use common::{BatchId, CustomerId, InvoiceId, InvoiceLineId, ProductId};

use crate::Result;
use crate::record::{Customer, Invoice, InvoiceLine, NewInvoice, NewInvoiceLine, Product};

/// The persistence collaborator behind the point of sale.
///
/// Reads return fully typed records; implementations are responsible for
/// mapping their native rows and rejecting malformed ones. All
/// implementations must be thread-safe (Send + Sync) because several
/// terminal sessions share one store.
#[async_trait]
pub trait PharmacyStore: Send + Sync {
    /// Returns every product with its batches and stock, ordered by name.
    async fn fetch_products(&self) -> Result<Vec<Product>>;

    /// Returns a single product with its batches and stock.
    async fn fetch_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Returns up to `limit` customers ordered by name.
    async fn fetch_customers(&self, limit: usize) -> Result<Vec<Customer>>;

    async fn fetch_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>>;

    /// Inserts an invoice, assigning its id and creation timestamp.
    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice>;

    async fn create_invoice_line(&self, line: NewInvoiceLine) -> Result<InvoiceLine>;

    /// Inserts a refund line against the sale line `sold_line_id`.
    ///
    /// The insert only applies when the units already refunded for that
    /// line's batch on refunds of the same invoice, plus `line.quantity`,
    /// stay within the quantity sold; otherwise it fails with
    /// `RefundLimitExceeded` and nothing changes. Concurrent refunds of the
    /// same sale line are serialized.
    async fn create_refund_line(
        &self,
        sold_line_id: InvoiceLineId,
        line: NewInvoiceLine,
    ) -> Result<InvoiceLine>;

    /// Reads the current quantity on hand for a batch.
    async fn read_stock_quantity(&self, batch_id: BatchId) -> Result<u32>;

    /// Atomically subtracts `delta` from a batch's stock.
    ///
    /// The update only applies when at least `delta` units are on hand;
    /// otherwise it fails with `InsufficientStock` and nothing changes.
    /// Returns the quantity left after the decrement.
    async fn decrement_stock_quantity(&self, batch_id: BatchId, delta: u32) -> Result<u32>;

    /// Atomically adds `delta` to a batch's stock. Returns the new quantity.
    async fn increment_stock_quantity(&self, batch_id: BatchId, delta: u32) -> Result<u32>;

    /// Removes an invoice line. Only used to compensate a failed checkout.
    async fn delete_invoice_line(&self, line_id: InvoiceLineId) -> Result<()>;

    /// Removes an invoice. Only used to compensate a failed checkout.
    async fn delete_invoice(&self, invoice_id: InvoiceId) -> Result<()>;

    async fn fetch_invoice(&self, invoice_id: InvoiceId) -> Result<Option<Invoice>>;

    async fn fetch_invoice_line(&self, line_id: InvoiceLineId) -> Result<Option<InvoiceLine>>;

    /// Returns the lines of an invoice in insertion order.
    async fn fetch_invoice_lines(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceLine>>;

    /// Returns the refund invoices recorded against `invoice_id`.
    async fn fetch_refunds(&self, invoice_id: InvoiceId) -> Result<Vec<Invoice>>;

    /// Returns the most recent invoices, newest first.
    async fn recent_invoices(&self, limit: usize) -> Result<Vec<Invoice>>;

    /// Counts stock records holding fewer than `threshold` units.
    async fn count_low_stock(&self, threshold: u32) -> Result<usize>;
}
