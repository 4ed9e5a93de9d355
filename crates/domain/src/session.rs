//! A terminal's checkout session: one cart and an optional customer.

use chrono::{DateTime, NaiveDate, Utc};
use common::{BatchId, SessionId};
use serde::Serialize;
use store::{Customer, Product};

use crate::aggregate::Aggregate;
use crate::cart::{AddLine, Advisory, Cart, CartError, CartEvent};

/// Label used on receipts when no customer is selected.
pub const WALK_IN: &str = "Walk-in";

/// What happened to the cart after an add-line request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AddLineOutcome {
    /// A new line was appended. Carries any advisories the operator confirmed.
    Added {
        product: String,
        batch_id: BatchId,
        quantity: u32,
        advisories: Vec<Advisory>,
    },

    /// An existing line's quantity grew.
    Incremented {
        product: String,
        batch_id: BatchId,
        quantity: u32,
    },

    /// Nothing changed; the operator must confirm these advisories first.
    ConfirmationRequired { advisories: Vec<Advisory> },
}

/// Session state owned by a single terminal.
///
/// Sessions are plain values; nothing about them is process-wide. The
/// checkout coordinator borrows one mutably for the duration of a commit.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: SessionId,
    cart: Cart,
    customer: Option<Customer>,
    opened_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            cart: Cart::default(),
            customer: None,
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Returns the selected customer's name, or [`WALK_IN`].
    pub fn customer_label(&self) -> &str {
        self.customer
            .as_ref()
            .map(|c| c.full_name.as_str())
            .unwrap_or(WALK_IN)
    }

    /// Adds `quantity` units of a product batch to the cart.
    #[tracing::instrument(skip(self, product), fields(session_id = %self.id, product = %product.name))]
    pub fn add_line(
        &mut self,
        product: &Product,
        batch_id: BatchId,
        quantity: u32,
        today: NaiveDate,
        confirmed: bool,
    ) -> Result<AddLineOutcome, CartError> {
        let decision = self
            .cart
            .add_line(product, batch_id, quantity, today, confirmed)
            .inspect_err(|e| tracing::info!(error = %e, "add line rejected"))?;

        let (events, advisories) = match decision {
            AddLine::NeedsConfirmation(advisories) => {
                tracing::info!(count = advisories.len(), "add line awaiting confirmation");
                return Ok(AddLineOutcome::ConfirmationRequired { advisories });
            }
            AddLine::Apply { events, advisories } => (events, advisories),
        };

        let outcome = match events.first() {
            Some(CartEvent::LineQuantityIncreased(data)) => AddLineOutcome::Incremented {
                product: product.name.clone(),
                batch_id,
                quantity: data.new_quantity,
            },
            _ => AddLineOutcome::Added {
                product: product.name.clone(),
                batch_id,
                quantity,
                advisories,
            },
        };

        self.cart.apply_events(events);
        metrics::counter!("cart_lines_added_total").increment(1);

        Ok(outcome)
    }

    /// Removes the cart line for a batch, if present.
    pub fn remove_line(&mut self, batch_id: BatchId) {
        let events = self.cart.remove_line(batch_id);
        self.cart.apply_events(events);
    }

    pub fn select_customer(&mut self, customer: Customer) {
        self.customer = Some(customer);
    }

    pub fn clear_customer(&mut self) {
        self.customer = None;
    }

    /// Empties the cart and clears the customer, as after a successful checkout.
    pub fn reset(&mut self) {
        let events = self.cart.clear();
        self.cart.apply_events(events);
        self.customer = None;
    }
}
