//! Vote, record-status and outcome enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validator's verdict on a work unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    Approve,
    Reject,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// Whether this vote agrees with the final outcome.
    pub fn matches(&self, outcome: Outcome) -> bool {
        matches!(
            (self, outcome),
            (Self::Approve, Outcome::Approved) | (Self::Reject, Outcome::Rejected)
        )
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal consensus outcome of a work unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Approved,
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single validation record. Mirrors the unit's outcome once resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Approved,
    Rejected,
}

impl RecordStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl From<Outcome> for RecordStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Approved => Self::Approved,
            Outcome::Rejected => Self::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_matches_outcome() {
        assert!(VoteKind::Approve.matches(Outcome::Approved));
        assert!(!VoteKind::Approve.matches(Outcome::Rejected));
        assert!(VoteKind::Reject.matches(Outcome::Rejected));
        assert!(!VoteKind::Reject.matches(Outcome::Approved));
    }

    #[test]
    fn record_status_from_outcome() {
        assert_eq!(RecordStatus::from(Outcome::Approved), RecordStatus::Approved);
        assert_eq!(RecordStatus::from(Outcome::Rejected), RecordStatus::Rejected);
        assert!(!RecordStatus::Pending.is_final());
        assert!(RecordStatus::Rejected.is_final());
    }
}
