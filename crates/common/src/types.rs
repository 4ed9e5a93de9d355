use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when an identifier string is not a valid UUID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} identifier: {value}")]
pub struct ParseIdError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a UUID-backed identifier newtype.
///
/// Each identifier is a distinct type so a batch id can never be passed
/// where an invoice id is expected.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }

            /// Returns the first eight hex digits, as printed on receipts.
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|_| ParseIdError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of a catalog product.
    ProductId,
    "product"
);
uuid_id!(
    /// Identifier of a dated, priced lot of a product.
    BatchId,
    "batch"
);
uuid_id!(
    /// Identifier of the stock record attached to a batch.
    StockRecordId,
    "stock record"
);
uuid_id!(
    /// Identifier of a customer (patient).
    CustomerId,
    "customer"
);
uuid_id!(
    /// Identifier of an invoice.
    InvoiceId,
    "invoice"
);
uuid_id!(
    /// Identifier of a single invoice line.
    InvoiceLineId,
    "invoice line"
);
uuid_id!(
    /// Identifier of a terminal session.
    SessionId,
    "session"
);
