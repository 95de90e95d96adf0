//! Validation record store: one vote per validator per work unit.

use std::sync::Arc;

use attest_registry::ValidatorRegistry;
use attest_store::{StoreError, ValidationRecord, ValidationRecordStore, WorkUnitStore};
use attest_types::{Clock, Outcome, RecordStatus, ValidatorId, VoteKind, WorkUnitId};
use tracing::{debug, warn};

use crate::ConsensusError;

/// Accepts votes and answers "who voted what" for a work unit.
///
/// Queries always re-read the backing store, so a result reflects the state
/// at call time and can be requested again freely.
pub struct VoteBook {
    records: Arc<dyn ValidationRecordStore>,
    work_units: Arc<dyn WorkUnitStore>,
    registry: Arc<ValidatorRegistry>,
    clock: Arc<dyn Clock>,
}

impl VoteBook {
    pub fn new(
        records: Arc<dyn ValidationRecordStore>,
        work_units: Arc<dyn WorkUnitStore>,
        registry: Arc<ValidatorRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            work_units,
            registry,
            clock,
        }
    }

    /// Record a pending vote.
    ///
    /// A second vote by the same validator on the same unit fails with
    /// [`ConsensusError::DuplicateVote`] and leaves the first one untouched.
    pub fn submit_vote(
        &self,
        work_unit: &WorkUnitId,
        validator: ValidatorId,
        vote: VoteKind,
        stake: u64,
    ) -> Result<ValidationRecord, ConsensusError> {
        if stake == 0 {
            return Err(ConsensusError::ZeroStake);
        }
        if !self.work_units.exists(work_unit)? {
            return Err(ConsensusError::UnknownWorkUnit(work_unit.clone()));
        }
        let holder = self.registry.get(validator)?;
        if stake > holder.stake {
            return Err(ConsensusError::StakeExceedsBalance {
                committed: stake,
                available: holder.stake,
            });
        }
        if self.has_voted(work_unit, validator)? {
            return Err(self.duplicate(work_unit, validator));
        }

        let record = ValidationRecord {
            id: self.records.next_vote_id()?,
            work_unit: work_unit.clone(),
            validator,
            vote,
            stake,
            status: RecordStatus::Pending,
            created_at: self.clock.now(),
        };
        match self.records.insert_record(&record) {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(self.duplicate(work_unit, validator)),
            Err(e) => return Err(e.into()),
        }

        debug!(
            id = %record.id,
            %work_unit,
            %validator,
            vote = vote.as_str(),
            stake,
            "vote recorded"
        );
        Ok(record)
    }

    /// Votes on a unit in submission order.
    pub fn votes_for(&self, work_unit: &WorkUnitId) -> Result<Vec<ValidationRecord>, ConsensusError> {
        Ok(self.records.records_for_work_unit(work_unit)?)
    }

    /// Move every vote on the unit to the status matching `outcome`.
    pub fn finalize(
        &self,
        work_unit: &WorkUnitId,
        outcome: Outcome,
    ) -> Result<Vec<ValidationRecord>, ConsensusError> {
        let changed = self.records.set_status(work_unit, RecordStatus::from(outcome))?;
        debug!(%work_unit, %outcome, changed, "votes finalized");
        self.votes_for(work_unit)
    }

    fn has_voted(&self, work_unit: &WorkUnitId, validator: ValidatorId) -> Result<bool, ConsensusError> {
        Ok(self
            .records
            .records_for_work_unit(work_unit)?
            .iter()
            .any(|r| r.validator == validator))
    }

    fn duplicate(&self, work_unit: &WorkUnitId, validator: ValidatorId) -> ConsensusError {
        warn!(%work_unit, %validator, "duplicate vote refused");
        ConsensusError::DuplicateVote {
            validator,
            work_unit: work_unit.clone(),
        }
    }
}
