//! Checkout and refund procedures for the pharmacy point of sale.
//!
//! Committing a cart is a multi-step write against the store:
//! 1. Create the invoice
//! 2. For each cart line, create the invoice line
//! 3. Decrement the batch stock with a guarded update
//!
//! If any step fails, previously completed steps are compensated in reverse
//! order and the cart is left intact. Refunds follow the same shape with a
//! stock increment in place of the decrement.

mod compensation;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod journal;
pub mod receipt;
pub mod refund;
pub mod state;

pub use coordinator::CheckoutCoordinator;
pub use error::{CheckoutError, RefundError};
pub use events::{CheckoutEvent, CompletedStep};
pub use journal::CheckoutJournal;
pub use receipt::{Receipt, ReceiptHeader, ReceiptLine};
pub use refund::{Refund, RefundService};
pub use state::CheckoutState;
