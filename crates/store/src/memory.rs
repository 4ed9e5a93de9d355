use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{BatchId, CustomerId, InvoiceId, InvoiceLineId, ProductId};
use tokio::sync::RwLock;

use crate::record::{Customer, Invoice, InvoiceLine, NewInvoice, NewInvoiceLine, Product};
use crate::row::CatalogFixture;
use crate::store::PharmacyStore;
use crate::{Result, StoreError};

/// Store operations that can be made to fail on demand in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FetchProducts,
    CreateInvoice,
    CreateInvoiceLine,
    DecrementStock,
    IncrementStock,
    DeleteInvoiceLine,
    DeleteInvoice,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StoreOp::FetchProducts => "fetch_products",
            StoreOp::CreateInvoice => "create_invoice",
            StoreOp::CreateInvoiceLine => "create_invoice_line",
            StoreOp::DecrementStock => "decrement_stock_quantity",
            StoreOp::IncrementStock => "increment_stock_quantity",
            StoreOp::DeleteInvoiceLine => "delete_invoice_line",
            StoreOp::DeleteInvoice => "delete_invoice",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    products: HashMap<ProductId, Product>,
    batch_index: HashMap<BatchId, ProductId>,
    customers: Vec<Customer>,
    invoices: Vec<Invoice>,
    lines: Vec<InvoiceLine>,
    /// Remaining successful calls before the operation fails once.
    failures: HashMap<StoreOp, usize>,
}

impl InMemoryState {
    fn stock_mut(&mut self, batch_id: BatchId) -> Result<&mut u32> {
        let product_id = self
            .batch_index
            .get(&batch_id)
            .ok_or_else(|| StoreError::not_found("batch", batch_id))?;
        self.products
            .get_mut(product_id)
            .and_then(|p| p.batches.iter_mut().find(|b| b.batch.id == batch_id))
            .map(|b| &mut b.stock.quantity)
            .ok_or_else(|| StoreError::not_found("batch", batch_id))
    }

    fn insert_line(&mut self, line: NewInvoiceLine) -> Result<InvoiceLine> {
        if !self.invoices.iter().any(|i| i.id == line.invoice_id) {
            return Err(StoreError::not_found("invoice", line.invoice_id));
        }
        if !self.batch_index.contains_key(&line.batch_id) {
            return Err(StoreError::not_found("batch", line.batch_id));
        }

        let line = InvoiceLine {
            id: InvoiceLineId::new(),
            invoice_id: line.invoice_id,
            batch_id: line.batch_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
        };
        self.lines.push(line.clone());
        Ok(line)
    }

    /// Units of the sold line's batch on refunds of the sold line's invoice.
    fn refunded_quantity(&self, sold: &InvoiceLine) -> u32 {
        self.invoices
            .iter()
            .filter(|i| i.refund_of == Some(sold.invoice_id))
            .flat_map(|refund| self.lines.iter().filter(move |l| l.invoice_id == refund.id))
            .filter(|l| l.batch_id == sold.batch_id)
            .map(|l| l.quantity)
            .sum()
    }

    fn check_failure(&mut self, op: StoreOp) -> Result<()> {
        let Some(remaining) = self.failures.get_mut(&op) else {
            return Ok(());
        };
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(());
        }
        self.failures.remove(&op);
        Err(StoreError::Unavailable(format!("injected failure on {op}")))
    }
}

/// In-memory store implementation for tests and the demo server.
///
/// Every write happens under a single write lock, so the guarded stock
/// decrement is atomic with respect to other sessions sharing the store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store preloaded with catalog records.
    pub fn seeded(products: Vec<Product>, customers: Vec<Customer>) -> Self {
        let mut state = InMemoryState::default();
        for product in products {
            for batch in &product.batches {
                state.batch_index.insert(batch.batch.id, product.id);
            }
            state.products.insert(product.id, product);
        }
        state.customers = customers;
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Creates a store from a JSON catalog dump of backend rows.
    pub fn from_fixture_json(json: &str) -> Result<Self> {
        let (products, customers) = CatalogFixture::from_json(json)?.into_records()?;
        tracing::info!(
            products = products.len(),
            customers = customers.len(),
            "loaded catalog fixture"
        );
        Ok(Self::seeded(products, customers))
    }

    /// Makes `op` fail once with `Unavailable` after `skip` successful calls.
    pub async fn fail_on(&self, op: StoreOp, skip: usize) {
        self.state.write().await.failures.insert(op, skip);
    }

    /// Returns the total number of invoices stored.
    pub async fn invoice_count(&self) -> usize {
        self.state.read().await.invoices.len()
    }

    /// Returns the total number of invoice lines stored.
    pub async fn invoice_line_count(&self) -> usize {
        self.state.read().await.lines.len()
    }
}

#[async_trait]
impl PharmacyStore for InMemoryStore {
    async fn fetch_products(&self) -> Result<Vec<Product>> {
        let mut state = self.state.write().await;
        state.check_failure(StoreOp::FetchProducts)?;

        let mut products: Vec<_> = state.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&product_id).cloned())
    }

    async fn fetch_customers(&self, limit: usize) -> Result<Vec<Customer>> {
        let state = self.state.read().await;
        let mut customers = state.customers.clone();
        customers.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        customers.truncate(limit);
        Ok(customers)
    }

    async fn fetch_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>> {
        let state = self.state.read().await;
        Ok(state.customers.iter().find(|c| c.id == customer_id).cloned())
    }

    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice> {
        let mut state = self.state.write().await;
        state.check_failure(StoreOp::CreateInvoice)?;

        let invoice = Invoice {
            id: InvoiceId::new(),
            total: invoice.total,
            amount_paid: invoice.amount_paid,
            customer_id: invoice.customer_id,
            status: invoice.status,
            refund_of: invoice.refund_of,
            created_at: Utc::now(),
        };
        state.invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn create_invoice_line(&self, line: NewInvoiceLine) -> Result<InvoiceLine> {
        let mut state = self.state.write().await;
        state.check_failure(StoreOp::CreateInvoiceLine)?;
        state.insert_line(line)
    }

    async fn create_refund_line(
        &self,
        sold_line_id: InvoiceLineId,
        line: NewInvoiceLine,
    ) -> Result<InvoiceLine> {
        let mut state = self.state.write().await;
        state.check_failure(StoreOp::CreateInvoiceLine)?;

        let sold = state
            .lines
            .iter()
            .find(|l| l.id == sold_line_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("invoice line", sold_line_id))?;
        let remaining = sold.quantity.saturating_sub(state.refunded_quantity(&sold));
        if line.quantity > remaining {
            return Err(StoreError::RefundLimitExceeded {
                line_id: sold_line_id,
                requested: line.quantity,
                remaining,
            });
        }
        state.insert_line(line)
    }

    async fn read_stock_quantity(&self, batch_id: BatchId) -> Result<u32> {
        let mut state = self.state.write().await;
        state.stock_mut(batch_id).map(|q| *q)
    }

    async fn decrement_stock_quantity(&self, batch_id: BatchId, delta: u32) -> Result<u32> {
        let mut state = self.state.write().await;
        state.check_failure(StoreOp::DecrementStock)?;

        let quantity = state.stock_mut(batch_id)?;
        if *quantity < delta {
            metrics::counter!("stock_conflicts_total").increment(1);
            return Err(StoreError::InsufficientStock {
                batch_id,
                requested: delta,
                available: *quantity,
            });
        }
        *quantity -= delta;
        Ok(*quantity)
    }

    async fn increment_stock_quantity(&self, batch_id: BatchId, delta: u32) -> Result<u32> {
        let mut state = self.state.write().await;
        state.check_failure(StoreOp::IncrementStock)?;

        let quantity = state.stock_mut(batch_id)?;
        *quantity = quantity.saturating_add(delta);
        Ok(*quantity)
    }

    async fn delete_invoice_line(&self, line_id: InvoiceLineId) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_failure(StoreOp::DeleteInvoiceLine)?;

        let before = state.lines.len();
        state.lines.retain(|l| l.id != line_id);
        if state.lines.len() == before {
            return Err(StoreError::not_found("invoice line", line_id));
        }
        Ok(())
    }

    async fn delete_invoice(&self, invoice_id: InvoiceId) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_failure(StoreOp::DeleteInvoice)?;

        let before = state.invoices.len();
        state.invoices.retain(|i| i.id != invoice_id);
        if state.invoices.len() == before {
            return Err(StoreError::not_found("invoice", invoice_id));
        }
        Ok(())
    }

    async fn fetch_invoice(&self, invoice_id: InvoiceId) -> Result<Option<Invoice>> {
        let state = self.state.read().await;
        Ok(state.invoices.iter().find(|i| i.id == invoice_id).cloned())
    }

    async fn fetch_invoice_line(&self, line_id: InvoiceLineId) -> Result<Option<InvoiceLine>> {
        let state = self.state.read().await;
        Ok(state.lines.iter().find(|l| l.id == line_id).cloned())
    }

    async fn fetch_invoice_lines(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceLine>> {
        let state = self.state.read().await;
        Ok(state
            .lines
            .iter()
            .filter(|l| l.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn fetch_refunds(&self, invoice_id: InvoiceId) -> Result<Vec<Invoice>> {
        let state = self.state.read().await;
        Ok(state
            .invoices
            .iter()
            .filter(|i| i.refund_of == Some(invoice_id))
            .cloned()
            .collect())
    }

    async fn recent_invoices(&self, limit: usize) -> Result<Vec<Invoice>> {
        let state = self.state.read().await;
        // Insertion order is creation order.
        Ok(state.invoices.iter().rev().take(limit).cloned().collect())
    }

    async fn count_low_stock(&self, threshold: u32) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .products
            .values()
            .flat_map(|p| p.batches.iter())
            .filter(|b| b.stock.quantity < threshold)
            .count())
    }
}
