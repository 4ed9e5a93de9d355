//! Operator-facing notices and where they go.

use std::sync::Mutex;

use serde::Serialize;

use crate::cart::{Advisory, CartError};
use crate::session::AddLineOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Error,
    Warning,
    Success,
}

/// A short message for the terminal operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Builds the notices for an add-line result.
    pub fn for_add_line(result: &Result<AddLineOutcome, CartError>) -> Vec<Notice> {
        match result {
            Err(e) => vec![Notice::from(e)],
            Ok(AddLineOutcome::ConfirmationRequired { advisories }) => {
                advisories.iter().map(Notice::from).collect()
            }
            Ok(AddLineOutcome::Added {
                product,
                advisories,
                ..
            }) => {
                let mut notices: Vec<Notice> = advisories.iter().map(Notice::from).collect();
                notices.push(Notice::success(format!("Added {product}")));
                notices
            }
            Ok(AddLineOutcome::Incremented { .. }) => vec![],
        }
    }
}

impl From<&CartError> for Notice {
    fn from(error: &CartError) -> Self {
        Notice::error(error.to_string())
    }
}

impl From<&Advisory> for Notice {
    fn from(advisory: &Advisory) -> Self {
        Notice::warning(advisory.to_string())
    }
}

/// Receives operator notices.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);

    fn notify_all(&self, notices: Vec<Notice>) {
        for notice in notices {
            self.notify(notice);
        }
    }
}

/// Writes notices to the structured log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::warn!(message = %notice.message, "notice"),
            NoticeLevel::Warning => tracing::info!(message = %notice.message, "notice"),
            NoticeLevel::Success => tracing::debug!(message = %notice.message, "notice"),
        }
    }
}

/// Collects notices in memory so they can be returned to a caller.
#[derive(Debug, Default)]
pub struct NoticeBuffer {
    notices: Mutex<Vec<Notice>>,
}

impl NoticeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything collected so far.
    pub fn drain(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl NotificationSink for NoticeBuffer {
    fn notify(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}
