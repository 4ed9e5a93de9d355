//! In-memory journal of a single checkout or refund run.

use common::InvoiceId;
use domain::Aggregate;
use serde::Serialize;

use crate::error::CheckoutError;
use crate::events::{CheckoutEvent, CompletedStep};
use crate::state::CheckoutState;

/// Tracks the writes a run has made so they can be undone in reverse order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckoutJournal {
    kind: Option<&'static str>,
    state: CheckoutState,
    completed_steps: Vec<CompletedStep>,
    compensated_steps: Vec<CompletedStep>,
    compensation_failures: Vec<(CompletedStep, String)>,
    invoice_id: Option<InvoiceId>,
    failure_reason: Option<String>,
}

impl Aggregate for CheckoutJournal {
    type Event = CheckoutEvent;
    type Error = CheckoutError;

    fn aggregate_type() -> &'static str {
        "CheckoutJournal"
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CheckoutEvent::Started(data) => {
                self.kind = Some(data.kind);
                self.state = CheckoutState::Running;
            }
            CheckoutEvent::StepCompleted(step) => {
                if let CompletedStep::InvoiceCreated { invoice_id } = step {
                    self.invoice_id = Some(invoice_id);
                }
                self.completed_steps.push(step);
            }
            CheckoutEvent::StepFailed(data) => {
                self.failure_reason = Some(format!("{}: {}", data.step, data.error));
            }
            CheckoutEvent::CompensationStarted => {
                self.state = CheckoutState::Compensating;
            }
            CheckoutEvent::CompensationStepCompleted(step) => {
                self.compensated_steps.push(step);
            }
            CheckoutEvent::CompensationStepFailed(data) => {
                self.compensation_failures.push((data.step, data.error));
            }
            CheckoutEvent::Completed(data) => {
                self.invoice_id = Some(data.invoice_id);
                self.state = CheckoutState::Completed;
            }
            CheckoutEvent::Failed(data) => {
                self.state = CheckoutState::Failed;
                self.failure_reason.get_or_insert(data.reason);
            }
        }
    }
}

impl CheckoutJournal {
    pub fn kind(&self) -> Option<&'static str> {
        self.kind
    }

    pub fn state(&self) -> CheckoutState {
        self.state
    }

    /// Steps that succeeded, in the order they ran.
    pub fn completed_steps(&self) -> &[CompletedStep] {
        &self.completed_steps
    }

    /// Steps that were undone, in the order they were undone.
    pub fn compensated_steps(&self) -> &[CompletedStep] {
        &self.compensated_steps
    }

    pub fn compensation_failures(&self) -> &[(CompletedStep, String)] {
        &self.compensation_failures
    }

    pub fn invoice_id(&self) -> Option<InvoiceId> {
        self.invoice_id
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Returns the completed steps that still need undoing, newest first.
    pub(crate) fn pending_compensation(&self) -> Vec<CompletedStep> {
        self.completed_steps.iter().rev().copied().collect()
    }
}
