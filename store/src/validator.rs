//! Validator storage trait.

use crate::StoreError;
use attest_types::{Timestamp, ValidatorId};
use serde::{Deserialize, Serialize};

/// A staked reviewer. Never deleted; kept as the audit history of its votes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub id: ValidatorId,
    pub institution: String,
    pub stake: u64,
    /// Always within `[0, 1]`.
    pub reputation: f64,
    pub total_votes: u64,
    /// Votes that matched the final outcome.
    pub correct_votes: u64,
    pub registered_at: Timestamp,
}

impl Validator {
    /// Fraction of votes that matched the outcome; 0 before any vote resolves.
    pub fn accuracy(&self) -> f64 {
        if self.total_votes == 0 {
            0.0
        } else {
            self.correct_votes as f64 / self.total_votes as f64
        }
    }
}

/// Trait for validator storage operations.
pub trait ValidatorStore: Send + Sync {
    /// Reserve the next validator id (registration order).
    fn next_validator_id(&self) -> Result<ValidatorId, StoreError>;
    fn put_validator(&self, validator: &Validator) -> Result<(), StoreError>;
    fn get_validator(&self, id: ValidatorId) -> Result<Validator, StoreError>;
    fn exists(&self, id: ValidatorId) -> Result<bool, StoreError>;
    /// All validators in registration order.
    fn iter_validators(&self) -> Result<Vec<Validator>, StoreError>;

    fn validator_count(&self) -> Result<u64, StoreError> {
        self.iter_validators().map(|v| v.len() as u64)
    }
}
