//! Point-of-sale domain layer.
//!
//! This crate provides:
//! - the Cart aggregate with its add-line decision procedure and advisories
//! - the terminal Session that owns a cart and an optional customer
//! - operator notices and the sinks that receive them
//! - catalog and dashboard queries over a [`store::PharmacyStore`]

pub mod aggregate;
pub mod cart;
pub mod catalog;
pub mod dashboard;
pub mod notice;
pub mod session;

pub use aggregate::{Aggregate, DomainEvent};
pub use cart::{AddLine, Advisory, Cart, CartError, CartEvent, CartLine};
pub use catalog::{CatalogError, CatalogService, DEFAULT_CUSTOMER_LIMIT};
pub use dashboard::{DashboardService, DashboardSettings, DashboardSummary};
pub use notice::{Notice, NoticeBuffer, NoticeLevel, NotificationSink, TracingSink};
pub use session::{AddLineOutcome, Session, WALK_IN};
