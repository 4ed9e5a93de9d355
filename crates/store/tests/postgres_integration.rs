//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate between tests.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use common::{BatchId, CustomerId, InvoiceLineId, Money, ProductId};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    InvoiceStatus, NewInvoice, NewInvoiceLine, PharmacyStore, PostgresStore, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_pharmacy_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE invoice_items, invoices, inventory, product_batches, products, customers",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

/// Inserts a product with one batch and returns both ids.
async fn seed_product(
    store: &PostgresStore,
    name: &str,
    interactions: &[&str],
    expiry: NaiveDate,
    quantity: i32,
) -> (ProductId, BatchId) {
    let product_id = ProductId::new();
    let batch_id = BatchId::new();
    let interactions: Vec<String> = interactions.iter().map(|s| s.to_string()).collect();

    sqlx::query(
        "INSERT INTO products (id, name, generic_name, list_price_cents, interaction_data) VALUES ($1, $2, NULL, 500, $3)",
    )
    .bind(product_id.as_uuid())
    .bind(name)
    .bind(&interactions)
    .execute(store.pool())
    .await
    .unwrap();

    add_batch(store, product_id, batch_id, "B-1", expiry, quantity).await;
    (product_id, batch_id)
}

async fn add_batch(
    store: &PostgresStore,
    product_id: ProductId,
    batch_id: BatchId,
    batch_number: &str,
    expiry: NaiveDate,
    quantity: i32,
) {
    sqlx::query(
        "INSERT INTO product_batches (id, product_id, batch_number, expiry_date, sale_price_cents, cost_price_cents) VALUES ($1, $2, $3, $4, 500, 300)",
    )
    .bind(batch_id.as_uuid())
    .bind(product_id.as_uuid())
    .bind(batch_number)
    .bind(expiry)
    .execute(store.pool())
    .await
    .unwrap();

    sqlx::query("INSERT INTO inventory (id, batch_id, quantity_boxes) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(batch_id.as_uuid())
        .bind(quantity)
        .execute(store.pool())
        .await
        .unwrap();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
#[serial]
async fn fetch_products_joins_batches_and_stock() {
    let store = get_test_store().await;
    let (product_id, first_batch) =
        seed_product(&store, "Warfarin", &["Aspirin"], date(2027, 1, 31), 7).await;
    let second_batch = BatchId::new();
    add_batch(&store, product_id, second_batch, "B-0", date(2026, 12, 31), 3).await;
    seed_product(&store, "Amoxicillin", &[], date(2027, 6, 30), 20).await;

    let products = store.fetch_products().await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Amoxicillin");

    let warfarin = &products[1];
    assert_eq!(warfarin.interactions, vec!["Aspirin".to_string()]);
    assert_eq!(warfarin.list_price, Money::from_cents(500));
    // Batches come back earliest expiry first.
    assert_eq!(warfarin.batches[0].batch.id, second_batch);
    assert_eq!(warfarin.batches[1].batch.id, first_batch);
    assert_eq!(warfarin.batches[1].quantity(), 7);
    assert_eq!(warfarin.total_stock(), 10);
}

#[tokio::test]
#[serial]
async fn fetch_product_without_batches() {
    let store = get_test_store().await;
    let product_id = ProductId::new();
    sqlx::query("INSERT INTO products (id, name, list_price_cents) VALUES ($1, 'Gauze', 150)")
        .bind(product_id.as_uuid())
        .execute(store.pool())
        .await
        .unwrap();

    let product = store.fetch_product(product_id).await.unwrap().unwrap();
    assert!(product.batches.is_empty());
    assert!(store.fetch_product(ProductId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn decrement_is_guarded() {
    let store = get_test_store().await;
    let (_, batch_id) = seed_product(&store, "Ibuprofen", &[], date(2027, 1, 1), 3).await;

    assert_eq!(store.decrement_stock_quantity(batch_id, 2).await.unwrap(), 1);

    let err = store.decrement_stock_quantity(batch_id, 2).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientStock {
            requested: 2,
            available: 1,
            ..
        }
    ));
    assert_eq!(store.read_stock_quantity(batch_id).await.unwrap(), 1);

    assert_eq!(store.increment_stock_quantity(batch_id, 4).await.unwrap(), 5);
}

#[tokio::test]
#[serial]
async fn decrement_unknown_batch_is_not_found() {
    let store = get_test_store().await;
    let err = store
        .decrement_stock_quantity(BatchId::new(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { entity: "batch", .. }));
}

#[tokio::test]
#[serial]
async fn concurrent_decrements_of_last_unit() {
    let store = get_test_store().await;
    let (_, batch_id) = seed_product(&store, "Insulin", &[], date(2027, 1, 1), 1).await;

    let (a, b) = tokio::join!(
        store.decrement_stock_quantity(batch_id, 1),
        store.decrement_stock_quantity(batch_id, 1)
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(store.read_stock_quantity(batch_id).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn invoices_and_lines_round_trip() {
    let store = get_test_store().await;
    let (_, batch_id) = seed_product(&store, "Paracetamol", &[], date(2027, 1, 1), 10).await;

    let invoice = store
        .create_invoice(NewInvoice::completed(Money::from_cents(1900), None))
        .await
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Completed);
    assert_eq!(invoice.amount_paid, Money::from_cents(1900));

    let line = store
        .create_invoice_line(NewInvoiceLine::sale(
            invoice.id,
            batch_id,
            2,
            Money::from_cents(950),
        ))
        .await
        .unwrap();
    assert_eq!(line.line_total, Money::from_cents(1900));

    let lines = store.fetch_invoice_lines(invoice.id).await.unwrap();
    assert_eq!(lines, vec![line.clone()]);
    assert_eq!(
        store.fetch_invoice_line(line.id).await.unwrap(),
        Some(line.clone())
    );

    let refund = store
        .create_invoice(NewInvoice::refund(&invoice, Money::from_cents(950)))
        .await
        .unwrap();
    assert_eq!(refund.total, Money::from_cents(-950));
    assert_eq!(store.fetch_refunds(invoice.id).await.unwrap(), vec![refund.clone()]);

    let recent = store.recent_invoices(10).await.unwrap();
    assert_eq!(recent[0].id, refund.id);
    assert_eq!(recent[1].id, invoice.id);
}

#[tokio::test]
#[serial]
async fn concurrent_refund_lines_respect_the_sold_quantity() {
    let store = get_test_store().await;
    let (_, batch_id) = seed_product(&store, "Loratadine", &[], date(2027, 1, 1), 10).await;
    let price = Money::from_cents(500);

    let sale = store
        .create_invoice(NewInvoice::completed(price, None))
        .await
        .unwrap();
    let sold = store
        .create_invoice_line(NewInvoiceLine::sale(sale.id, batch_id, 1, price))
        .await
        .unwrap();
    let first = store
        .create_invoice(NewInvoice::refund(&sale, price))
        .await
        .unwrap();
    let second = store
        .create_invoice(NewInvoice::refund(&sale, price))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        store.create_refund_line(sold.id, NewInvoiceLine::refund(first.id, batch_id, 1, price)),
        store.create_refund_line(sold.id, NewInvoiceLine::refund(second.id, batch_id, 1, price))
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(
        err,
        StoreError::RefundLimitExceeded {
            requested: 1,
            remaining: 0,
            ..
        }
    ));

    let refund_lines = store.fetch_invoice_lines(first.id).await.unwrap().len()
        + store.fetch_invoice_lines(second.id).await.unwrap().len();
    assert_eq!(refund_lines, 1);
}

#[tokio::test]
#[serial]
async fn compensating_deletes() {
    let store = get_test_store().await;
    let (_, batch_id) = seed_product(&store, "Cetirizine", &[], date(2027, 1, 1), 10).await;

    let invoice = store
        .create_invoice(NewInvoice::completed(Money::from_cents(500), None))
        .await
        .unwrap();
    let line = store
        .create_invoice_line(NewInvoiceLine::sale(
            invoice.id,
            batch_id,
            1,
            Money::from_cents(500),
        ))
        .await
        .unwrap();

    store.delete_invoice_line(line.id).await.unwrap();
    store.delete_invoice(invoice.id).await.unwrap();

    assert!(store.fetch_invoice(invoice.id).await.unwrap().is_none());
    let err = store
        .delete_invoice_line(InvoiceLineId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
#[serial]
async fn customers_and_low_stock() {
    let store = get_test_store().await;
    seed_product(&store, "Low", &[], date(2027, 1, 1), 4).await;
    seed_product(&store, "Enough", &[], date(2027, 1, 1), 5).await;

    for name in ["Zaid", "Amina", "Layla"] {
        sqlx::query("INSERT INTO customers (id, full_name) VALUES ($1, $2)")
            .bind(CustomerId::new().as_uuid())
            .bind(name)
            .execute(store.pool())
            .await
            .unwrap();
    }

    let customers = store.fetch_customers(2).await.unwrap();
    let names: Vec<_> = customers.iter().map(|c| c.full_name.as_str()).collect();
    assert_eq!(names, vec!["Amina", "Layla"]);

    let found = store.fetch_customer(customers[0].id).await.unwrap();
    assert_eq!(found.as_ref().map(|c| c.full_name.as_str()), Some("Amina"));

    assert_eq!(store.count_low_stock(5).await.unwrap(), 1);
}
