//! Validator registration and single-writer state updates.

use std::sync::{Arc, Mutex, MutexGuard};

use attest_store::{StoreError, Validator, ValidatorStore};
use attest_types::{Clock, ConsensusParams, ValidatorId};
use tracing::{debug, info};

use crate::RegistryError;

/// Clamp a reputation score into `[0, 1]`.
pub fn clamp_reputation(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

pub struct ValidatorRegistry {
    store: Arc<dyn ValidatorStore>,
    clock: Arc<dyn Clock>,
    min_stake: u64,
    initial_reputation: f64,
    /// Serializes read-modify-write cycles on validator state.
    write_lock: Mutex<()>,
}

impl ValidatorRegistry {
    pub fn new(
        store: Arc<dyn ValidatorStore>,
        clock: Arc<dyn Clock>,
        params: &ConsensusParams,
    ) -> Self {
        Self {
            store,
            clock,
            min_stake: params.min_validator_stake,
            initial_reputation: clamp_reputation(params.initial_reputation),
            write_lock: Mutex::new(()),
        }
    }

    /// Register a new validator with its initial stake.
    pub fn register(&self, institution: &str, stake: u64) -> Result<Validator, RegistryError> {
        let institution = institution.trim();
        if institution.is_empty() {
            return Err(RegistryError::EmptyInstitution);
        }
        if stake < self.min_stake {
            return Err(RegistryError::InsufficientStake {
                needed: self.min_stake,
                provided: stake,
            });
        }

        let _guard = self.write_guard()?;
        let validator = Validator {
            id: self.store.next_validator_id()?,
            institution: institution.to_string(),
            stake,
            reputation: self.initial_reputation,
            total_votes: 0,
            correct_votes: 0,
            registered_at: self.clock.now(),
        };
        self.store.put_validator(&validator)?;
        info!(id = %validator.id, institution, stake, "validator registered");
        Ok(validator)
    }

    pub fn get(&self, id: ValidatorId) -> Result<Validator, RegistryError> {
        self.store.get_validator(id).map_err(|e| match e {
            StoreError::NotFound(_) => RegistryError::UnknownValidator(id),
            other => RegistryError::Store(other),
        })
    }

    /// All validators in registration order.
    pub fn list(&self) -> Result<Vec<Validator>, RegistryError> {
        Ok(self.store.iter_validators()?)
    }

    /// Apply a signed reputation delta, clamping the result to `[0, 1]`.
    pub fn adjust_reputation(&self, id: ValidatorId, delta: f64) -> Result<Validator, RegistryError> {
        if !delta.is_finite() {
            return Err(RegistryError::InvalidDelta(delta));
        }
        self.update(id, |v| {
            v.reputation = clamp_reputation(v.reputation + delta);
        })
    }

    /// Count a resolved vote, and a correct one if it matched the outcome.
    pub fn record_outcome(&self, id: ValidatorId, was_correct: bool) -> Result<Validator, RegistryError> {
        self.update(id, |v| {
            v.total_votes += 1;
            if was_correct {
                v.correct_votes += 1;
            }
        })
    }

    fn update<F>(&self, id: ValidatorId, mutate: F) -> Result<Validator, RegistryError>
    where
        F: FnOnce(&mut Validator),
    {
        let _guard = self.write_guard()?;
        let mut validator = self.get(id)?;
        mutate(&mut validator);
        self.store.put_validator(&validator)?;
        debug!(
            %id,
            reputation = validator.reputation,
            total_votes = validator.total_votes,
            correct_votes = validator.correct_votes,
            "validator updated"
        );
        Ok(validator)
    }

    fn write_guard(&self) -> Result<MutexGuard<'_, ()>, RegistryError> {
        self.write_lock
            .lock()
            .map_err(|_| RegistryError::Store(StoreError::Backend("registry lock poisoned".into())))
    }
}
