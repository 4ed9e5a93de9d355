//! Shared types for the pharmacy point-of-sale workspace.

pub mod money;
pub mod types;

pub use money::{Money, ParseMoneyError};
pub use types::{
    BatchId, CustomerId, InvoiceId, InvoiceLineId, ParseIdError, ProductId, SessionId,
    StockRecordId,
};
