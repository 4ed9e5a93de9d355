//! Persistence collaborator for the pharmacy point of sale.
//!
//! - [`PharmacyStore`] is the only seam the checkout core talks to
//! - [`row`] maps loosely shaped backend rows onto the typed [`record`]s
//! - [`InMemoryStore`] backs tests and the demo server
//! - [`PostgresStore`] is the production backend

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod row;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, StoreOp};
pub use postgres::PostgresStore;
pub use record::{
    Batch, BatchStock, Customer, Invoice, InvoiceLine, InvoiceStatus, NewInvoice, NewInvoiceLine,
    Product, StockRecord,
};
pub use row::{BatchRow, CatalogFixture, CustomerRow, InventoryRow, ProductRow};
pub use store::PharmacyStore;
