//! Journal events recorded while a checkout or refund runs.

use chrono::{DateTime, Utc};
use common::{BatchId, InvoiceId, InvoiceLineId, Money};
use domain::DomainEvent;
use serde::{Deserialize, Serialize};

pub const STEP_CREATE_INVOICE: &str = "create_invoice";
pub const STEP_CREATE_INVOICE_LINE: &str = "create_invoice_line";
pub const STEP_DECREMENT_STOCK: &str = "decrement_stock";
pub const STEP_INCREMENT_STOCK: &str = "increment_stock";

/// A write that succeeded and would have to be undone on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CompletedStep {
    InvoiceCreated { invoice_id: InvoiceId },
    InvoiceLineCreated { line_id: InvoiceLineId, batch_id: BatchId },
    StockDecremented { batch_id: BatchId, quantity: u32 },
    StockIncremented { batch_id: BatchId, quantity: u32 },
}

impl CompletedStep {
    /// Name of the write that undoes this step.
    pub fn compensation_name(&self) -> &'static str {
        match self {
            CompletedStep::InvoiceCreated { .. } => "delete_invoice",
            CompletedStep::InvoiceLineCreated { .. } => "delete_invoice_line",
            CompletedStep::StockDecremented { .. } => STEP_INCREMENT_STOCK,
            CompletedStep::StockIncremented { .. } => STEP_DECREMENT_STOCK,
        }
    }
}

/// Events that can occur during a checkout or refund.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CheckoutEvent {
    Started(StartedData),
    StepCompleted(CompletedStep),
    StepFailed(StepFailedData),
    CompensationStarted,
    CompensationStepCompleted(CompletedStep),
    /// Logged; compensation carries on with the remaining steps.
    CompensationStepFailed(CompensationFailedData),
    Completed(CompletedData),
    Failed(FailedData),
}

impl DomainEvent for CheckoutEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CheckoutEvent::Started(_) => "CheckoutStarted",
            CheckoutEvent::StepCompleted(_) => "StepCompleted",
            CheckoutEvent::StepFailed(_) => "StepFailed",
            CheckoutEvent::CompensationStarted => "CompensationStarted",
            CheckoutEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            CheckoutEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            CheckoutEvent::Completed(_) => "CheckoutCompleted",
            CheckoutEvent::Failed(_) => "CheckoutFailed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedData {
    /// "sale" or "refund".
    pub kind: &'static str,
    pub line_count: usize,
    pub total: Money,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepFailedData {
    pub step: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompensationFailedData {
    pub step: CompletedStep,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedData {
    pub invoice_id: InvoiceId,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedData {
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

impl CheckoutEvent {
    pub fn started(kind: &'static str, line_count: usize, total: Money) -> Self {
        CheckoutEvent::Started(StartedData {
            kind,
            line_count,
            total,
            started_at: Utc::now(),
        })
    }

    pub fn step_failed(step: &'static str, error: impl ToString) -> Self {
        CheckoutEvent::StepFailed(StepFailedData {
            step,
            error: error.to_string(),
        })
    }

    pub fn compensation_step_failed(step: CompletedStep, error: impl ToString) -> Self {
        CheckoutEvent::CompensationStepFailed(CompensationFailedData {
            step,
            error: error.to_string(),
        })
    }

    pub fn completed(invoice_id: InvoiceId) -> Self {
        CheckoutEvent::Completed(CompletedData {
            invoice_id,
            completed_at: Utc::now(),
        })
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        CheckoutEvent::Failed(FailedData {
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }
}
