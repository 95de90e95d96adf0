//! Consensus engine: routes votes into per-unit elections and applies
//! resolutions to the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use attest_registry::ValidatorRegistry;
use attest_store::{StoreError, Validator, ValidationRecord, ValidationRecordStore, WorkUnitStore};
use attest_types::{
    Clock, ConsensusParams, Outcome, Timestamp, ValidatorId, VoteKind, WorkUnit, WorkUnitId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::election::{ConsensusStatus, Election, ResolutionRule, Tally};
use crate::reputation::{delta_magnitude, signed_delta, ReputationChange};
use crate::vote_book::VoteBook;
use crate::ConsensusError;

/// Emitted once per work unit when its election resolves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub work_unit: WorkUnitId,
    pub declared_value: f64,
    pub outcome: Outcome,
    pub rule: ResolutionRule,
    pub tally: Tally,
    /// Finalized votes in submission order.
    pub votes: Vec<ValidationRecord>,
    /// Reputation feedback in registration order.
    pub changes: Vec<ReputationChange>,
    /// Participant state after feedback, in registration order.
    pub participants: Vec<Validator>,
    pub resolved_at: Timestamp,
}

impl Resolution {
    /// Sum of the requested reputation deltas over all participants.
    pub fn reputation_delta(&self) -> f64 {
        self.changes.iter().map(|c| c.delta).sum()
    }

    /// Approve stake minus reject stake, saturated into `i64`.
    pub fn stake_delta(&self) -> i64 {
        let diff = self.tally.weighted_approve as i128 - self.tally.weighted_reject as i128;
        diff.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn participant_ids(&self) -> Vec<ValidatorId> {
        self.participants.iter().map(|v| v.id).collect()
    }
}

/// Result of an accepted vote.
#[derive(Clone, Debug)]
pub struct VoteReceipt {
    pub record: ValidationRecord,
    /// The voter as it stood when the vote was cast.
    pub validator: Validator,
    pub status: ConsensusStatus,
    /// Present when this vote resolved the unit.
    pub resolution: Option<Resolution>,
}

/// Stake-weighted consensus over work units.
///
/// Each work unit has its own election behind its own mutex; votes on
/// different units proceed in parallel while votes on one unit are tallied
/// and resolved one at a time, so a unit can resolve at most once.
pub struct ConsensusEngine {
    params: ConsensusParams,
    registry: Arc<ValidatorRegistry>,
    votes: VoteBook,
    work_units: Arc<dyn WorkUnitStore>,
    clock: Arc<dyn Clock>,
    elections: Mutex<HashMap<WorkUnitId, Arc<Mutex<Election>>>>,
}

impl ConsensusEngine {
    /// Build an engine; `params` must pass [`ConsensusParams::validate`].
    pub fn new(
        params: ConsensusParams,
        registry: Arc<ValidatorRegistry>,
        records: Arc<dyn ValidationRecordStore>,
        work_units: Arc<dyn WorkUnitStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConsensusError> {
        params.validate()?;
        let votes = VoteBook::new(records, work_units.clone(), registry.clone(), clock.clone());
        Ok(Self {
            params,
            registry,
            votes,
            work_units,
            clock,
            elections: Mutex::new(HashMap::new()),
        })
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    pub fn registry(&self) -> &Arc<ValidatorRegistry> {
        &self.registry
    }

    /// Accept a work unit for validation and open its election.
    pub fn register_work_unit(
        &self,
        id: WorkUnitId,
        declared_value: f64,
    ) -> Result<WorkUnit, ConsensusError> {
        let unit = WorkUnit {
            id,
            declared_value,
            submitted_at: self.clock.now(),
        };
        if !unit.has_valid_value() {
            return Err(ConsensusError::InvalidDeclaredValue(declared_value));
        }

        let mut elections = lock(&self.elections, "elections")?;
        match self.work_units.put_work_unit(&unit) {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(ConsensusError::DuplicateWorkUnit(unit.id)),
            Err(e) => return Err(e.into()),
        }
        elections.insert(
            unit.id.clone(),
            Arc::new(Mutex::new(Election::new(unit.id.clone(), unit.submitted_at))),
        );
        info!(work_unit = %unit.id, declared_value, "work unit registered");
        Ok(unit)
    }

    /// Record a vote and resolve the unit if the vote completes it.
    pub fn cast_vote(
        &self,
        work_unit: &WorkUnitId,
        validator: ValidatorId,
        vote: VoteKind,
        stake: u64,
    ) -> Result<VoteReceipt, ConsensusError> {
        let election = self.election(work_unit)?;
        let mut election = lock(&election, "election")?;
        if election.is_resolved() {
            return Err(ConsensusError::AlreadyResolved(work_unit.clone()));
        }

        let snapshot = self.registry.get(validator)?;
        let record = self.votes.submit_vote(work_unit, validator, vote, stake)?;
        let resolution = self.advance(&mut election)?;
        Ok(VoteReceipt {
            record,
            validator: snapshot,
            status: election.status(),
            resolution,
        })
    }

    /// Re-evaluate a unit without a new vote.
    ///
    /// Fails with [`ConsensusError::AlreadyResolved`] on a resolved unit and
    /// returns `None` while no rule is met.
    pub fn try_resolve(&self, work_unit: &WorkUnitId) -> Result<Option<Resolution>, ConsensusError> {
        let election = self.election(work_unit)?;
        let mut election = lock(&election, "election")?;
        if election.is_resolved() {
            return Err(ConsensusError::AlreadyResolved(work_unit.clone()));
        }
        self.advance(&mut election)
    }

    pub fn status(&self, work_unit: &WorkUnitId) -> Result<ConsensusStatus, ConsensusError> {
        let election = self.election(work_unit)?;
        let election = lock(&election, "election")?;
        Ok(election.status())
    }

    /// Units that have not resolved yet, sorted by id.
    pub fn pending_work_units(&self) -> Result<Vec<WorkUnitId>, ConsensusError> {
        let handles: Vec<_> = lock(&self.elections, "elections")?.values().cloned().collect();
        let mut pending = Vec::new();
        for handle in handles {
            let election = lock(&handle, "election")?;
            if !election.is_resolved() {
                pending.push(election.work_unit.clone());
            }
        }
        pending.sort();
        Ok(pending)
    }

    pub fn votes_for(&self, work_unit: &WorkUnitId) -> Result<Vec<ValidationRecord>, ConsensusError> {
        self.votes.votes_for(work_unit)
    }

    pub fn work_unit(&self, id: &WorkUnitId) -> Result<WorkUnit, ConsensusError> {
        self.work_units.get_work_unit(id).map_err(|e| match e {
            StoreError::NotFound(_) => ConsensusError::UnknownWorkUnit(id.clone()),
            other => ConsensusError::Store(other),
        })
    }

    fn election(&self, work_unit: &WorkUnitId) -> Result<Arc<Mutex<Election>>, ConsensusError> {
        lock(&self.elections, "elections")?
            .get(work_unit)
            .cloned()
            .ok_or_else(|| ConsensusError::UnknownWorkUnit(work_unit.clone()))
    }

    /// Retally from the vote book and resolve if a rule is met.
    ///
    /// Callers hold the election lock.
    fn advance(&self, election: &mut Election) -> Result<Option<Resolution>, ConsensusError> {
        let now = self.clock.now();
        let votes = self.votes.votes_for(&election.work_unit)?;
        election.observe(&votes, now);
        debug!(
            work_unit = %election.work_unit,
            voters = election.tally.distinct_voters,
            approve = %election.tally.weighted_approve,
            reject = %election.tally.weighted_reject,
            "tally updated"
        );
        match election.try_resolve(&self.params, now) {
            Some((outcome, rule)) => self.apply(election, outcome, rule, now).map(Some),
            None => Ok(None),
        }
    }

    fn apply(
        &self,
        election: &Election,
        outcome: Outcome,
        rule: ResolutionRule,
        now: Timestamp,
    ) -> Result<Resolution, ConsensusError> {
        let unit = self.work_unit(&election.work_unit)?;
        let votes = self.votes.finalize(&unit.id, outcome)?;
        let magnitude = delta_magnitude(unit.declared_value, &self.params);

        let mut by_registration: Vec<&ValidationRecord> = votes.iter().collect();
        by_registration.sort_by_key(|r| r.validator);

        let mut changes = Vec::with_capacity(votes.len());
        let mut participants = Vec::with_capacity(votes.len());
        for record in by_registration {
            let was_correct = record.vote.matches(outcome);
            let delta = signed_delta(record.vote, outcome, magnitude);
            self.registry.record_outcome(record.validator, was_correct)?;
            let after = self.registry.adjust_reputation(record.validator, delta)?;
            changes.push(ReputationChange {
                validator: record.validator,
                vote: record.vote,
                stake: record.stake,
                was_correct,
                delta,
                reputation_after: after.reputation,
            });
            participants.push(after);
        }

        info!(
            work_unit = %unit.id,
            %outcome,
            ?rule,
            voters = election.tally.distinct_voters,
            approve = %election.tally.weighted_approve,
            reject = %election.tally.weighted_reject,
            "work unit resolved"
        );
        Ok(Resolution {
            work_unit: unit.id,
            declared_value: unit.declared_value,
            outcome,
            rule,
            tally: election.tally,
            votes,
            changes,
            participants,
            resolved_at: now,
        })
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, ConsensusError> {
    mutex
        .lock()
        .map_err(|_| ConsensusError::Store(StoreError::Backend(format!("{what} lock poisoned"))))
}
