//! Cart domain events.

use common::BatchId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::CartLine;

/// Events that can occur on a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// A new line was appended.
    LineAdded(CartLine),

    /// An existing line's quantity grew.
    LineQuantityIncreased(LineQuantityIncreasedData),

    /// A line was removed.
    LineRemoved(LineRemovedData),

    /// Every line was dropped.
    CartCleared,
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::LineAdded(_) => "LineAdded",
            CartEvent::LineQuantityIncreased(_) => "LineQuantityIncreased",
            CartEvent::LineRemoved(_) => "LineRemoved",
            CartEvent::CartCleared => "CartCleared",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuantityIncreasedData {
    pub batch_id: BatchId,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRemovedData {
    pub batch_id: BatchId,
}

impl CartEvent {
    pub fn line_added(line: CartLine) -> Self {
        CartEvent::LineAdded(line)
    }

    pub fn line_quantity_increased(batch_id: BatchId, old_quantity: u32, new_quantity: u32) -> Self {
        CartEvent::LineQuantityIncreased(LineQuantityIncreasedData {
            batch_id,
            old_quantity,
            new_quantity,
        })
    }

    pub fn line_removed(batch_id: BatchId) -> Self {
        CartEvent::LineRemoved(LineRemovedData { batch_id })
    }
}
