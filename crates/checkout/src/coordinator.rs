//! Checkout coordinator: commits a session's cart as an invoice.

use std::time::Instant;

use domain::{Aggregate, Session};
use store::{NewInvoice, NewInvoiceLine, PharmacyStore, StoreError};

use crate::compensation::compensate;
use crate::error::CheckoutError;
use crate::events::{
    CheckoutEvent, CompletedStep, STEP_CREATE_INVOICE, STEP_CREATE_INVOICE_LINE,
    STEP_DECREMENT_STOCK,
};
use crate::journal::CheckoutJournal;
use crate::receipt::{Receipt, ReceiptLine};

/// A failed forward step and the store error behind it.
struct StepFailure {
    step: &'static str,
    error: StoreError,
}

fn at(step: &'static str) -> impl FnOnce(StoreError) -> StepFailure {
    move |error| StepFailure { step, error }
}

/// Commits carts to the store.
///
/// The commit is a sequence of writes: one invoice, then for each line an
/// invoice line and a guarded stock decrement. If any write fails, the
/// writes already made are undone in reverse order so the store looks as
/// if the checkout never started.
pub struct CheckoutCoordinator<S: PharmacyStore> {
    store: S,
}

impl<S: PharmacyStore> CheckoutCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Checks out the session's cart.
    ///
    /// On success the session is reset and a receipt returned. On failure
    /// the session is untouched so the operator can retry.
    pub async fn execute(&self, session: &mut Session) -> Result<Receipt, CheckoutError> {
        self.execute_journaled(session).await.1
    }

    /// Like [`execute`](Self::execute), also returning the run's journal.
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn execute_journaled(
        &self,
        session: &mut Session,
    ) -> (CheckoutJournal, Result<Receipt, CheckoutError>) {
        let mut journal = CheckoutJournal::default();

        if session.cart().is_empty() {
            return (journal, Err(CheckoutError::EmptyCart));
        }

        metrics::counter!("checkout_total").increment(1);
        let started = Instant::now();
        let total = session.cart().total();
        journal.apply(CheckoutEvent::started("sale", session.cart().line_count(), total));

        let result = match self.commit(session, &mut journal).await {
            Ok(receipt) => {
                journal.apply(CheckoutEvent::completed(receipt.invoice_id));
                session.reset();

                metrics::counter!("checkout_completed_total").increment(1);
                tracing::info!(
                    invoice_id = %receipt.invoice_id,
                    total = %receipt.total,
                    lines = receipt.lines.len(),
                    "checkout completed"
                );
                Ok(receipt)
            }
            Err(failure) => {
                journal.apply(CheckoutEvent::step_failed(failure.step, &failure.error));
                let error = match compensate(&self.store, &mut journal).await {
                    Some((step, source)) => CheckoutError::CompensationFailed {
                        step,
                        cause: format!("{}: {}", failure.step, failure.error),
                        source,
                    },
                    None => self.classify(session, failure),
                };

                metrics::counter!("checkout_failed_total").increment(1);
                tracing::warn!(error = %error, state = %journal.state(), "checkout failed");
                Err(error)
            }
        };

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        (journal, result)
    }

    /// Runs the forward writes, recording each one in the journal.
    async fn commit(
        &self,
        session: &Session,
        journal: &mut CheckoutJournal,
    ) -> Result<Receipt, StepFailure> {
        let cart = session.cart();
        let customer_id = session.customer().map(|c| c.id);

        let invoice = self
            .store
            .create_invoice(NewInvoice::completed(cart.total(), customer_id))
            .await
            .map_err(at(STEP_CREATE_INVOICE))?;
        journal.apply(CheckoutEvent::StepCompleted(CompletedStep::InvoiceCreated {
            invoice_id: invoice.id,
        }));

        for line in cart.lines() {
            let created = self
                .store
                .create_invoice_line(NewInvoiceLine::sale(
                    invoice.id,
                    line.batch_id,
                    line.quantity,
                    line.unit_price,
                ))
                .await
                .map_err(at(STEP_CREATE_INVOICE_LINE))?;
            journal.apply(CheckoutEvent::StepCompleted(CompletedStep::InvoiceLineCreated {
                line_id: created.id,
                batch_id: line.batch_id,
            }));

            let remaining = self
                .store
                .decrement_stock_quantity(line.batch_id, line.quantity)
                .await
                .map_err(at(STEP_DECREMENT_STOCK))?;
            journal.apply(CheckoutEvent::StepCompleted(CompletedStep::StockDecremented {
                batch_id: line.batch_id,
                quantity: line.quantity,
            }));
            tracing::debug!(batch_id = %line.batch_id, remaining, "stock decremented");
        }

        Ok(Receipt {
            invoice_id: invoice.id,
            created_at: invoice.created_at,
            customer_label: session.customer_label().to_string(),
            lines: cart.lines().iter().map(ReceiptLine::from).collect(),
            total: invoice.total,
        })
    }

    fn classify(&self, session: &Session, failure: StepFailure) -> CheckoutError {
        match failure.error {
            StoreError::InsufficientStock {
                batch_id,
                requested,
                available,
            } => CheckoutError::InsufficientStock {
                product: session
                    .cart()
                    .line(batch_id)
                    .map(|l| l.product_name.clone())
                    .unwrap_or_default(),
                batch_id,
                requested,
                available,
            },
            error => CheckoutError::CheckoutFailed {
                step: failure.step,
                source: error,
            },
        }
    }
}
