use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A non-blocking warning raised while adding a line.
///
/// Advisories gate the add on operator confirmation; they never reject it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// The product being added interacts with one already in the cart.
    Interaction { added: String, existing: String },

    /// An earlier-expiring batch of the same product is still sellable.
    Fifo {
        product: String,
        batch_number: String,
        expiry: NaiveDate,
    },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::Interaction { added, existing } => {
                write!(f, "INTERACTION ALERT: {added} conflicts with {existing}!")
            }
            Advisory::Fifo {
                product,
                batch_number,
                expiry,
            } => write!(
                f,
                "FIFO ALERT: {product} batch {batch_number} expires earlier ({expiry}); sell it first?"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_message_names_both_products() {
        let advisory = Advisory::Interaction {
            added: "Aspirin".into(),
            existing: "Warfarin".into(),
        };
        assert_eq!(
            advisory.to_string(),
            "INTERACTION ALERT: Aspirin conflicts with Warfarin!"
        );
    }

    #[test]
    fn serializes_with_kind_tag() {
        let advisory = Advisory::Fifo {
            product: "Amoxicillin".into(),
            batch_number: "A-1".into(),
            expiry: NaiveDate::from_ymd_opt(2026, 11, 30).unwrap(),
        };
        let json = serde_json::to_value(&advisory).unwrap();
        assert_eq!(json["kind"], "fifo");
        assert_eq!(json["expiry"], "2026-11-30");
    }
}
