//! Work units submitted by the computation collaborator.

use crate::{Timestamp, WorkUnitId};
use serde::{Deserialize, Serialize};

/// A unit of completed computational work awaiting certification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub id: WorkUnitId,
    /// Declared scientific value; scales reputation deltas on resolution.
    pub declared_value: f64,
    pub submitted_at: Timestamp,
}

impl WorkUnit {
    /// Whether the declared value can drive reputation updates.
    pub fn has_valid_value(&self) -> bool {
        self.declared_value.is_finite() && self.declared_value >= 0.0
    }
}
