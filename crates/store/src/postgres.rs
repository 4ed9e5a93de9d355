use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{BatchId, CustomerId, InvoiceId, InvoiceLineId, Money, ProductId, StockRecordId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::record::{
    Batch, BatchStock, Customer, Invoice, InvoiceLine, InvoiceStatus, NewInvoice, NewInvoiceLine,
    Product, StockRecord,
};
use crate::row::quantity_field;
use crate::store::PharmacyStore;
use crate::{Result, StoreError};

const PRODUCT_SELECT: &str = r#"
    SELECT p.id AS product_id, p.name, p.generic_name, p.strength, p.list_price_cents,
           p.interaction_data,
           b.id AS batch_id, b.batch_number, b.expiry_date, b.sale_price_cents, b.cost_price_cents,
           i.id AS stock_id, i.quantity_boxes
    FROM products p
    LEFT JOIN product_batches b ON b.product_id = p.id
    LEFT JOIN inventory i ON i.batch_id = b.id
"#;

const INVOICE_COLUMNS: &str = "id, total_amount_cents, final_amount_paid_cents, customer_id, status, refund_of, created_at";

const LINE_COLUMNS: &str = "id, invoice_id, batch_id, quantity, unit_price_cents, line_total_cents";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a small pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Folds joined product/batch/stock rows into products.
    ///
    /// Rows must arrive grouped by product.
    fn assemble_products(rows: Vec<PgRow>) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = Vec::new();

        for row in rows {
            let product_id = ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?);

            if products.last().map(|p| p.id) != Some(product_id) {
                let name: String = row.try_get("name")?;
                if name.trim().is_empty() {
                    return Err(StoreError::malformed("product", "empty name"));
                }
                products.push(Product {
                    id: product_id,
                    name,
                    generic_name: row.try_get("generic_name")?,
                    strength: row.try_get("strength")?,
                    list_price: Money::from_cents(row.try_get("list_price_cents")?),
                    interactions: row.try_get("interaction_data")?,
                    batches: Vec::new(),
                });
            }

            if let Some(batch) = Self::row_to_batch(product_id, &row)?
                && let Some(product) = products.last_mut()
            {
                product.batches.push(batch);
            }
        }

        Ok(products)
    }

    fn row_to_batch(product_id: ProductId, row: &PgRow) -> Result<Option<BatchStock>> {
        let Some(batch_id) = row.try_get::<Option<Uuid>, _>("batch_id")? else {
            return Ok(None);
        };
        let batch_id = BatchId::from_uuid(batch_id);

        let stock_id: Option<Uuid> = row.try_get("stock_id")?;
        let quantity: Option<i32> = row.try_get("quantity_boxes")?;
        let (Some(stock_id), Some(quantity)) = (stock_id, quantity) else {
            return Err(StoreError::malformed(
                "inventory",
                format!("batch {batch_id} has no stock record"),
            ));
        };

        Ok(Some(BatchStock {
            batch: Batch {
                id: batch_id,
                product_id,
                batch_number: row.try_get("batch_number")?,
                expiry: row.try_get::<NaiveDate, _>("expiry_date")?,
                sale_price: Money::from_cents(row.try_get("sale_price_cents")?),
                cost_price: Money::from_cents(row.try_get("cost_price_cents")?),
            },
            stock: StockRecord {
                id: StockRecordId::from_uuid(stock_id),
                batch_id,
                quantity: quantity_field("inventory", quantity.into())?,
            },
        }))
    }

    fn row_to_customer(row: PgRow) -> Result<Customer> {
        Ok(Customer {
            id: CustomerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            full_name: row.try_get("full_name")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
        })
    }

    fn row_to_invoice(row: PgRow) -> Result<Invoice> {
        let status: String = row.try_get("status")?;
        let status = InvoiceStatus::parse(&status)
            .ok_or_else(|| StoreError::malformed("invoice", format!("unknown status {status}")))?;

        Ok(Invoice {
            id: InvoiceId::from_uuid(row.try_get::<Uuid, _>("id")?),
            total: Money::from_cents(row.try_get("total_amount_cents")?),
            amount_paid: Money::from_cents(row.try_get("final_amount_paid_cents")?),
            customer_id: row
                .try_get::<Option<Uuid>, _>("customer_id")?
                .map(CustomerId::from_uuid),
            status,
            refund_of: row
                .try_get::<Option<Uuid>, _>("refund_of")?
                .map(InvoiceId::from_uuid),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn insert_line<'e, E>(executor: E, line: &NewInvoiceLine) -> Result<InvoiceLine>
    where
        E: sqlx::postgres::PgExecutor<'e>,
    {
        let sql = format!(
            r#"
            INSERT INTO invoice_items (id, invoice_id, batch_id, quantity, unit_price_cents, line_total_cents)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {LINE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(InvoiceLineId::new().as_uuid())
            .bind(line.invoice_id.as_uuid())
            .bind(line.batch_id.as_uuid())
            .bind(db_quantity(line.quantity)?)
            .bind(line.unit_price.cents())
            .bind(line.line_total.cents())
            .fetch_one(executor)
            .await?;

        Self::row_to_line(row)
    }

    fn row_to_line(row: PgRow) -> Result<InvoiceLine> {
        let quantity: i32 = row.try_get("quantity")?;
        Ok(InvoiceLine {
            id: InvoiceLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
            invoice_id: InvoiceId::from_uuid(row.try_get::<Uuid, _>("invoice_id")?),
            batch_id: BatchId::from_uuid(row.try_get::<Uuid, _>("batch_id")?),
            quantity: quantity_field("invoice line", quantity.into())?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            line_total: Money::from_cents(row.try_get("line_total_cents")?),
        })
    }
}

fn db_quantity(quantity: u32) -> Result<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::malformed("inventory", format!("quantity out of range: {quantity}")))
}

#[async_trait]
impl PharmacyStore for PostgresStore {
    async fn fetch_products(&self) -> Result<Vec<Product>> {
        let sql = format!("{PRODUCT_SELECT} ORDER BY p.name ASC, p.id ASC, b.expiry_date ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Self::assemble_products(rows)
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1 ORDER BY b.expiry_date ASC");
        let rows = sqlx::query(&sql)
            .bind(product_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        Ok(Self::assemble_products(rows)?.into_iter().next())
    }

    async fn fetch_customers(&self, limit: usize) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            "SELECT id, full_name, phone, email FROM customers ORDER BY full_name ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_customer).collect()
    }

    async fn fetch_customer(&self, customer_id: CustomerId) -> Result<Option<Customer>> {
        sqlx::query("SELECT id, full_name, phone, email FROM customers WHERE id = $1")
            .bind(customer_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_customer)
            .transpose()
    }

    async fn create_invoice(&self, invoice: NewInvoice) -> Result<Invoice> {
        let sql = format!(
            r#"
            INSERT INTO invoices (id, total_amount_cents, final_amount_paid_cents, customer_id, status, refund_of)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INVOICE_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(InvoiceId::new().as_uuid())
            .bind(invoice.total.cents())
            .bind(invoice.amount_paid.cents())
            .bind(invoice.customer_id.map(|c| c.as_uuid()))
            .bind(invoice.status.as_str())
            .bind(invoice.refund_of.map(|i| i.as_uuid()))
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_invoice(row)
    }

    async fn create_invoice_line(&self, line: NewInvoiceLine) -> Result<InvoiceLine> {
        Self::insert_line(&self.pool, &line).await
    }

    async fn create_refund_line(
        &self,
        sold_line_id: InvoiceLineId,
        line: NewInvoiceLine,
    ) -> Result<InvoiceLine> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the sale line serializes refunds against it.
        let sold = sqlx::query(
            "SELECT invoice_id, batch_id, quantity FROM invoice_items WHERE id = $1 FOR UPDATE",
        )
        .bind(sold_line_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("invoice line", sold_line_id))?;
        let invoice_id: Uuid = sold.try_get("invoice_id")?;
        let batch_id: Uuid = sold.try_get("batch_id")?;
        let sold_quantity: i32 = sold.try_get("quantity")?;

        let refunded: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(ii.quantity), 0)::BIGINT
            FROM invoice_items ii
            JOIN invoices i ON i.id = ii.invoice_id
            WHERE i.refund_of = $1 AND ii.batch_id = $2
            "#,
        )
        .bind(invoice_id)
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;

        let remaining =
            quantity_field("invoice line", (i64::from(sold_quantity) - refunded).max(0))?;
        if line.quantity > remaining {
            return Err(StoreError::RefundLimitExceeded {
                line_id: sold_line_id,
                requested: line.quantity,
                remaining,
            });
        }

        let inserted = Self::insert_line(&mut *tx, &line).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn read_stock_quantity(&self, batch_id: BatchId) -> Result<u32> {
        let quantity: Option<i32> =
            sqlx::query_scalar("SELECT quantity_boxes FROM inventory WHERE batch_id = $1")
                .bind(batch_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        let quantity = quantity.ok_or_else(|| StoreError::not_found("batch", batch_id))?;
        quantity_field("inventory", quantity.into())
    }

    async fn decrement_stock_quantity(&self, batch_id: BatchId, delta: u32) -> Result<u32> {
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE inventory
            SET quantity_boxes = quantity_boxes - $2
            WHERE batch_id = $1 AND quantity_boxes >= $2
            RETURNING quantity_boxes
            "#,
        )
        .bind(batch_id.as_uuid())
        .bind(db_quantity(delta)?)
        .fetch_optional(&self.pool)
        .await?;

        match remaining {
            Some(quantity) => quantity_field("inventory", quantity.into()),
            None => {
                // The guard rejected the update: either the batch is unknown or short.
                let available = self.read_stock_quantity(batch_id).await?;
                metrics::counter!("stock_conflicts_total").increment(1);
                Err(StoreError::InsufficientStock {
                    batch_id,
                    requested: delta,
                    available,
                })
            }
        }
    }

    async fn increment_stock_quantity(&self, batch_id: BatchId, delta: u32) -> Result<u32> {
        let quantity: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE inventory
            SET quantity_boxes = quantity_boxes + $2
            WHERE batch_id = $1
            RETURNING quantity_boxes
            "#,
        )
        .bind(batch_id.as_uuid())
        .bind(db_quantity(delta)?)
        .fetch_optional(&self.pool)
        .await?;

        let quantity = quantity.ok_or_else(|| StoreError::not_found("batch", batch_id))?;
        quantity_field("inventory", quantity.into())
    }

    async fn delete_invoice_line(&self, line_id: InvoiceLineId) -> Result<()> {
        let result = sqlx::query("DELETE FROM invoice_items WHERE id = $1")
            .bind(line_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("invoice line", line_id));
        }
        Ok(())
    }

    async fn delete_invoice(&self, invoice_id: InvoiceId) -> Result<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(invoice_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("invoice", invoice_id));
        }
        Ok(())
    }

    async fn fetch_invoice(&self, invoice_id: InvoiceId) -> Result<Option<Invoice>> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1");
        sqlx::query(&sql)
            .bind(invoice_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_invoice)
            .transpose()
    }

    async fn fetch_invoice_line(&self, line_id: InvoiceLineId) -> Result<Option<InvoiceLine>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM invoice_items WHERE id = $1");
        sqlx::query(&sql)
            .bind(line_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_line)
            .transpose()
    }

    async fn fetch_invoice_lines(&self, invoice_id: InvoiceId) -> Result<Vec<InvoiceLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM invoice_items WHERE invoice_id = $1 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(invoice_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn fetch_refunds(&self, invoice_id: InvoiceId) -> Result<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE refund_of = $1 ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(invoice_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_invoice).collect()
    }

    async fn recent_invoices(&self, limit: usize) -> Result<Vec<Invoice>> {
        let sql =
            format!("SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY created_at DESC LIMIT $1");
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_invoice).collect()
    }

    async fn count_low_stock(&self, threshold: u32) -> Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory WHERE quantity_boxes < $1")
                .bind(db_quantity(threshold)?)
                .fetch_one(&self.pool)
                .await?;

        Ok(count as usize)
    }
}
