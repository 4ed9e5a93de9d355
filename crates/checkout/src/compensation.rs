//! Undoing completed writes after a failed run.

use domain::Aggregate;
use store::{PharmacyStore, StoreError};

use crate::events::{CheckoutEvent, CompletedStep};
use crate::journal::CheckoutJournal;

/// Reverses one completed write.
async fn undo<S: PharmacyStore>(store: &S, step: CompletedStep) -> Result<(), StoreError> {
    match step {
        CompletedStep::InvoiceCreated { invoice_id } => store.delete_invoice(invoice_id).await,
        CompletedStep::InvoiceLineCreated { line_id, .. } => {
            store.delete_invoice_line(line_id).await
        }
        CompletedStep::StockDecremented { batch_id, quantity } => store
            .increment_stock_quantity(batch_id, quantity)
            .await
            .map(|_| ()),
        CompletedStep::StockIncremented { batch_id, quantity } => store
            .decrement_stock_quantity(batch_id, quantity)
            .await
            .map(|_| ()),
    }
}

/// Undoes every completed step, newest first, and marks the journal failed.
///
/// A step that cannot be undone is recorded and the rest still run.
/// Returns the first compensation failure, if any.
#[tracing::instrument(skip(store, journal), fields(kind = journal.kind()))]
pub(crate) async fn compensate<S: PharmacyStore>(
    store: &S,
    journal: &mut CheckoutJournal,
) -> Option<(&'static str, StoreError)> {
    journal.apply(CheckoutEvent::CompensationStarted);
    let mut first_failure = None;

    for step in journal.pending_compensation() {
        match undo(store, step).await {
            Ok(()) => {
                tracing::debug!(step = step.compensation_name(), "compensation step completed");
                journal.apply(CheckoutEvent::CompensationStepCompleted(step));
            }
            Err(e) => {
                tracing::error!(
                    step = step.compensation_name(),
                    error = %e,
                    "compensation step failed"
                );
                journal.apply(CheckoutEvent::compensation_step_failed(step, &e));
                first_failure.get_or_insert((step.compensation_name(), e));
            }
        }
    }

    let reason = journal.failure_reason().unwrap_or("unknown").to_string();
    journal.apply(CheckoutEvent::failed(reason));
    first_failure
}
