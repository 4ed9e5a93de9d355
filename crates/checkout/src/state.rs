//! Checkout state machine.

use serde::{Deserialize, Serialize};

/// The state of a checkout or refund in its lifecycle.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    #[default]
    NotStarted,

    /// Writes are being made.
    Running,

    /// A write failed and earlier writes are being undone.
    Compensating,

    /// Every write succeeded (terminal state).
    Completed,

    /// Compensation ran after a failure (terminal state).
    Failed,
}

impl CheckoutState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::NotStarted => "NotStarted",
            CheckoutState::Running => "Running",
            CheckoutState::Compensating => "Compensating",
            CheckoutState::Completed => "Completed",
            CheckoutState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_started() {
        assert_eq!(CheckoutState::default(), CheckoutState::NotStarted);
    }

    #[test]
    fn display_uses_variant_names() {
        assert_eq!(CheckoutState::Compensating.to_string(), "Compensating");
    }
}
