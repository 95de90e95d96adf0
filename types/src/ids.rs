//! Identifier newtypes.
//!
//! Validator, vote and ledger ids are assigned sequentially by their owning
//! store, so ordering by id is ordering by creation. Work-unit ids come from
//! the computation collaborator and are opaque strings.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(&self) -> u64 {
                self.0
            }

            /// The id following this one.
            pub const fn next(&self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

sequential_id!(
    /// Validator identity, assigned in registration order.
    ValidatorId,
    "validator-"
);
sequential_id!(
    /// Id of a single validation vote.
    VoteId,
    "vote-"
);
sequential_id!(
    /// Monotonically increasing ledger entry id. The first entry is `LedgerId(1)`.
    LedgerId,
    "entry-"
);

/// External reference to a unit of computational work under review.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkUnitId(String);

impl WorkUnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkUnitId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_order_and_display() {
        let a = LedgerId::new(1);
        assert_eq!(a.next(), LedgerId::new(2));
        assert!(a < a.next());
        assert_eq!(a.to_string(), "entry-1");
        assert_eq!(ValidatorId::new(7).to_string(), "validator-7");
    }

    #[test]
    fn work_unit_id_from_str() {
        let id: WorkUnitId = "discovery-42".into();
        assert_eq!(id.as_str(), "discovery-42");
        assert_eq!(id.to_string(), "discovery-42");
    }
}
