//! Refunds against committed sales.

use common::InvoiceLineId;
use domain::Aggregate;
use serde::Serialize;
use store::{
    Invoice, InvoiceLine, InvoiceStatus, NewInvoice, NewInvoiceLine, PharmacyStore, StoreError,
};

use crate::compensation::compensate;
use crate::error::RefundError;
use crate::events::{
    CheckoutEvent, CompletedStep, STEP_CREATE_INVOICE, STEP_CREATE_INVOICE_LINE,
    STEP_INCREMENT_STOCK,
};
use crate::journal::CheckoutJournal;

/// A committed refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refund {
    /// The new `REFUNDED` invoice, with a negative total.
    pub invoice: Invoice,
    pub line: InvoiceLine,
    /// Stock level of the batch after the units were put back.
    pub restocked: u32,
}

/// Refunds units of a sold invoice line.
///
/// The original invoice is never touched. A refund appends a negative
/// invoice pointing back at it, a negative line for the same batch, and
/// returns the units to stock.
pub struct RefundService<S: PharmacyStore> {
    store: S,
}

impl<S: PharmacyStore> RefundService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self), fields(line_id = %line_id))]
    pub async fn refund(
        &self,
        line_id: InvoiceLineId,
        quantity: u32,
    ) -> Result<Refund, RefundError> {
        if quantity == 0 {
            return Err(RefundError::InvalidQuantity);
        }

        let line = self
            .store
            .fetch_invoice_line(line_id)
            .await?
            .ok_or(RefundError::LineNotFound(line_id))?;
        let original = self
            .store
            .fetch_invoice(line.invoice_id)
            .await?
            .ok_or(RefundError::InvoiceNotFound(line.invoice_id))?;
        if original.status != InvoiceStatus::Completed {
            return Err(RefundError::NotRefundable {
                invoice_id: original.id,
                status: original.status,
            });
        }

        // Early rejection; the store guards the cap again when the line is written.
        let refunded = self.refunded_quantity(&original, &line).await?;
        let remaining = line.quantity.saturating_sub(refunded);
        if quantity > remaining {
            return Err(RefundError::ExceedsRefundable {
                requested: quantity,
                remaining,
            });
        }

        let amount = line.unit_price.multiply(quantity);
        let mut journal = CheckoutJournal::default();
        journal.apply(CheckoutEvent::started("refund", 1, amount.negate()));

        match self.commit(&original, &line, quantity, &mut journal).await {
            Ok(refund) => {
                journal.apply(CheckoutEvent::completed(refund.invoice.id));
                metrics::counter!("refunds_total").increment(1);
                tracing::info!(
                    refund_id = %refund.invoice.id,
                    original_id = %original.id,
                    quantity,
                    amount = %amount,
                    "refund completed"
                );
                Ok(refund)
            }
            Err((step, error)) => {
                journal.apply(CheckoutEvent::step_failed(step, &error));
                let error = match compensate(&self.store, &mut journal).await {
                    Some((compensation_step, source)) => RefundError::CompensationFailed {
                        step: compensation_step,
                        cause: format!("{step}: {error}"),
                        source,
                    },
                    // Another refund of the same line committed first.
                    None => match error {
                        StoreError::RefundLimitExceeded {
                            requested,
                            remaining,
                            ..
                        } => RefundError::ExceedsRefundable {
                            requested,
                            remaining,
                        },
                        error => RefundError::RefundFailed { step, source: error },
                    },
                };
                tracing::warn!(error = %error, "refund failed");
                Err(error)
            }
        }
    }

    /// Units of this line's batch already refunded against the original.
    async fn refunded_quantity(
        &self,
        original: &Invoice,
        line: &InvoiceLine,
    ) -> Result<u32, RefundError> {
        let mut refunded = 0u32;
        for refund in self.store.fetch_refunds(original.id).await? {
            refunded += self
                .store
                .fetch_invoice_lines(refund.id)
                .await?
                .iter()
                .filter(|l| l.batch_id == line.batch_id)
                .map(|l| l.quantity)
                .sum::<u32>();
        }
        Ok(refunded)
    }

    async fn commit(
        &self,
        original: &Invoice,
        line: &InvoiceLine,
        quantity: u32,
        journal: &mut CheckoutJournal,
    ) -> Result<Refund, (&'static str, StoreError)> {
        let amount = line.unit_price.multiply(quantity);

        let invoice = self
            .store
            .create_invoice(NewInvoice::refund(original, amount))
            .await
            .map_err(|e| (STEP_CREATE_INVOICE, e))?;
        journal.apply(CheckoutEvent::StepCompleted(CompletedStep::InvoiceCreated {
            invoice_id: invoice.id,
        }));

        let refund_line = self
            .store
            .create_refund_line(
                line.id,
                NewInvoiceLine::refund(invoice.id, line.batch_id, quantity, line.unit_price),
            )
            .await
            .map_err(|e| (STEP_CREATE_INVOICE_LINE, e))?;
        journal.apply(CheckoutEvent::StepCompleted(CompletedStep::InvoiceLineCreated {
            line_id: refund_line.id,
            batch_id: line.batch_id,
        }));

        let restocked = self
            .store
            .increment_stock_quantity(line.batch_id, quantity)
            .await
            .map_err(|e| (STEP_INCREMENT_STOCK, e))?;
        journal.apply(CheckoutEvent::StepCompleted(CompletedStep::StockIncremented {
            batch_id: line.batch_id,
            quantity,
        }));

        Ok(Refund {
            invoice,
            line: refund_line,
            restocked,
        })
    }
}
