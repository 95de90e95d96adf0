//! Per-work-unit election state machine.
//!
//! An election opens when a work unit is registered. Every accepted vote moves
//! it to `PendingConsensus` and triggers a fresh tally over the unit's votes.
//! Once `quorum` distinct validators have voted, a stake-weighted approval
//! ratio at or above the threshold resolves Approved, and the mirrored ratio
//! resolves Rejected. A contested tally (neither side at the threshold) is
//! handled by [`ContestedPolicy`]: rejected immediately, or left open until the
//! vote cap where the heavier side wins and an exact tie resolves Rejected.

use attest_store::ValidationRecord;
use attest_types::{ConsensusParams, ContestedPolicy, Outcome, Timestamp, ValidatorId, VoteKind, WorkUnitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The lifecycle state of a work unit's election.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusState {
    /// Registered, no votes yet.
    Open,
    /// Votes recorded, no threshold met. Units can stay here indefinitely.
    PendingConsensus,
    /// Terminal.
    Resolved(Outcome),
}

impl ConsensusState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Which rule produced an outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    /// Approve ratio reached the approval threshold.
    ApprovalThreshold,
    /// Reject ratio reached the approval threshold.
    RejectionThreshold,
    /// Quorum met without a supermajority on either side.
    NoSupermajority,
    /// Vote cap reached; the heavier side won.
    WeightedMajority,
    /// Vote cap reached with equal weight on both sides.
    Tie,
}

/// Stake-weighted tally of a unit's votes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub weighted_approve: u128,
    pub weighted_reject: u128,
    pub distinct_voters: u32,
}

impl Tally {
    /// Recompute from scratch over the given votes.
    pub fn from_votes(votes: &[ValidationRecord]) -> Self {
        let mut voters = BTreeSet::<ValidatorId>::new();
        let mut tally = Self::default();
        for record in votes {
            match record.vote {
                VoteKind::Approve => tally.weighted_approve += record.stake as u128,
                VoteKind::Reject => tally.weighted_reject += record.stake as u128,
            }
            voters.insert(record.validator);
        }
        tally.distinct_voters = voters.len() as u32;
        tally
    }

    pub fn total(&self) -> u128 {
        self.weighted_approve + self.weighted_reject
    }

    /// Approve share of the weighted stake, 0 for an empty tally.
    pub fn approval_ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.weighted_approve as f64 / total as f64
        }
    }

    /// Apply the resolution rules. `None` means keep waiting.
    pub fn decide(&self, params: &ConsensusParams) -> Option<(Outcome, ResolutionRule)> {
        if self.distinct_voters < params.quorum {
            return None;
        }
        let threshold = params.approval_threshold;
        let total = self.total();
        if threshold.is_met(self.weighted_approve, total) {
            return Some((Outcome::Approved, ResolutionRule::ApprovalThreshold));
        }
        if threshold.is_met(self.weighted_reject, total) {
            return Some((Outcome::Rejected, ResolutionRule::RejectionThreshold));
        }
        if params.contested == ContestedPolicy::RejectAtQuorum {
            return Some((Outcome::Rejected, ResolutionRule::NoSupermajority));
        }
        if self.distinct_voters < params.vote_cap {
            return None;
        }
        Some(match self.weighted_approve.cmp(&self.weighted_reject) {
            std::cmp::Ordering::Greater => (Outcome::Approved, ResolutionRule::WeightedMajority),
            std::cmp::Ordering::Less => (Outcome::Rejected, ResolutionRule::WeightedMajority),
            std::cmp::Ordering::Equal => (Outcome::Rejected, ResolutionRule::Tie),
        })
    }
}

/// Point-in-time view of an election.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusStatus {
    pub work_unit: WorkUnitId,
    pub state: ConsensusState,
    pub distinct_voters: u32,
    pub weighted_approve: u128,
    pub weighted_reject: u128,
}

/// A single work unit's election.
#[derive(Clone, Debug)]
pub struct Election {
    pub work_unit: WorkUnitId,
    pub state: ConsensusState,
    pub tally: Tally,
    pub created_at: Timestamp,
    /// When the state last changed.
    pub state_changed_at: Timestamp,
}

impl Election {
    /// Create a new election in the Open state.
    pub fn new(work_unit: WorkUnitId, now: Timestamp) -> Self {
        Self {
            work_unit,
            state: ConsensusState::Open,
            tally: Tally::default(),
            created_at: now,
            state_changed_at: now,
        }
    }

    /// Replace the tally with one recomputed from `votes`.
    ///
    /// Ignored once resolved; the final tally is kept as it was.
    pub fn observe(&mut self, votes: &[ValidationRecord], now: Timestamp) {
        if self.is_resolved() {
            return;
        }
        self.tally = Tally::from_votes(votes);
        if self.state == ConsensusState::Open && self.tally.distinct_voters > 0 {
            self.state = ConsensusState::PendingConsensus;
            self.state_changed_at = now;
        }
    }

    /// Resolve if the current tally meets a rule.
    ///
    /// Returns the outcome only on the transition into `Resolved`; calling it
    /// again afterwards returns `None`.
    pub fn try_resolve(
        &mut self,
        params: &ConsensusParams,
        now: Timestamp,
    ) -> Option<(Outcome, ResolutionRule)> {
        if self.is_resolved() {
            return None;
        }
        let (outcome, rule) = self.tally.decide(params)?;
        self.state = ConsensusState::Resolved(outcome);
        self.state_changed_at = now;
        Some((outcome, rule))
    }

    pub fn is_resolved(&self) -> bool {
        self.state.is_resolved()
    }

    pub fn status(&self) -> ConsensusStatus {
        ConsensusStatus {
            work_unit: self.work_unit.clone(),
            state: self.state,
            distinct_voters: self.tally.distinct_voters,
            weighted_approve: self.tally.weighted_approve,
            weighted_reject: self.tally.weighted_reject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_types::{RecordStatus, VoteId};

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    fn vote(n: u64, kind: VoteKind, stake: u64) -> ValidationRecord {
        ValidationRecord {
            id: VoteId::new(n),
            work_unit: WorkUnitId::new("wu"),
            validator: ValidatorId::new(n),
            vote: kind,
            stake,
            status: RecordStatus::Pending,
            created_at: ts(n),
        }
    }

    fn params() -> ConsensusParams {
        ConsensusParams::default()
    }

    #[test]
    fn new_election_is_open() {
        let e = Election::new(WorkUnitId::new("wu"), ts(100));
        assert_eq!(e.state, ConsensusState::Open);
        assert_eq!(e.tally, Tally::default());
    }

    #[test]
    fn first_vote_moves_to_pending() {
        let mut e = Election::new(WorkUnitId::new("wu"), ts(100));
        e.observe(&[vote(1, VoteKind::Approve, 100)], ts(101));
        assert_eq!(e.state, ConsensusState::PendingConsensus);
        assert_eq!(e.state_changed_at, ts(101));
        assert!(e.try_resolve(&params(), ts(101)).is_none());
    }

    #[test]
    fn unanimous_approval_resolves_approved() {
        let mut e = Election::new(WorkUnitId::new("wu"), ts(100));
        let votes: Vec<_> = (1..=3).map(|n| vote(n, VoteKind::Approve, 100)).collect();
        e.observe(&votes, ts(103));

        let (outcome, rule) = e.try_resolve(&params(), ts(103)).expect("should resolve");
        assert_eq!(outcome, Outcome::Approved);
        assert_eq!(rule, ResolutionRule::ApprovalThreshold);
        assert_eq!(e.status().weighted_approve, 300);
        assert_eq!(e.status().distinct_voters, 3);
    }

    fn at_vote_cap(quorum: u32, vote_cap: u32) -> ConsensusParams {
        ConsensusParams {
            quorum,
            vote_cap,
            contested: ContestedPolicy::MajorityAtVoteCap,
            ..params()
        }
    }

    #[test]
    fn heavy_approver_below_threshold_is_rejected() {
        // 300 / 500 = 0.6 < 2/3
        let votes = [
            vote(1, VoteKind::Approve, 300),
            vote(2, VoteKind::Reject, 100),
            vote(3, VoteKind::Reject, 100),
        ];
        let tally = Tally::from_votes(&votes);
        assert!((tally.approval_ratio() - 0.6).abs() < 1e-12);
        assert_eq!(
            tally.decide(&params()),
            Some((Outcome::Rejected, ResolutionRule::NoSupermajority))
        );
    }

    #[test]
    fn mirrored_threshold_rejects() {
        let votes = [
            vote(1, VoteKind::Approve, 100),
            vote(2, VoteKind::Reject, 100),
            vote(3, VoteKind::Reject, 100),
        ];
        assert_eq!(
            Tally::from_votes(&votes).decide(&params()),
            Some((Outcome::Rejected, ResolutionRule::RejectionThreshold))
        );
    }

    #[test]
    fn exact_two_thirds_approves() {
        let votes = [
            vote(1, VoteKind::Approve, 100),
            vote(2, VoteKind::Approve, 100),
            vote(3, VoteKind::Reject, 100),
        ];
        assert_eq!(
            Tally::from_votes(&votes).decide(&params()).map(|(o, _)| o),
            Some(Outcome::Approved)
        );
    }

    #[test]
    fn below_quorum_never_resolves() {
        let votes = [vote(1, VoteKind::Approve, 1_000), vote(2, VoteKind::Approve, 1_000)];
        assert!(Tally::from_votes(&votes).decide(&params()).is_none());
    }

    #[test]
    fn contested_vote_waits_until_cap() {
        let votes = [
            vote(1, VoteKind::Approve, 300),
            vote(2, VoteKind::Reject, 100),
            vote(3, VoteKind::Reject, 100),
        ];
        let tally = Tally::from_votes(&votes);
        assert!(tally.decide(&at_vote_cap(3, 7)).is_none());
        assert_eq!(
            tally.decide(&at_vote_cap(3, 3)),
            Some((Outcome::Approved, ResolutionRule::WeightedMajority))
        );
    }

    #[test]
    fn tie_at_cap_resolves_rejected() {
        let params = at_vote_cap(2, 4);
        let votes = [
            vote(1, VoteKind::Approve, 50),
            vote(2, VoteKind::Approve, 50),
            vote(3, VoteKind::Reject, 50),
            vote(4, VoteKind::Reject, 50),
        ];
        assert_eq!(
            Tally::from_votes(&votes).decide(&params),
            Some((Outcome::Rejected, ResolutionRule::Tie))
        );
    }

    #[test]
    fn try_resolve_returns_none_when_already_resolved() {
        let mut e = Election::new(WorkUnitId::new("wu"), ts(100));
        let votes: Vec<_> = (1..=3).map(|n| vote(n, VoteKind::Reject, 10)).collect();
        e.observe(&votes, ts(101));
        assert!(e.try_resolve(&params(), ts(101)).is_some());
        assert_eq!(e.state, ConsensusState::Resolved(Outcome::Rejected));
        assert!(e.try_resolve(&params(), ts(102)).is_none());
    }

    #[test]
    fn observe_is_ignored_after_resolution() {
        let mut e = Election::new(WorkUnitId::new("wu"), ts(100));
        let votes: Vec<_> = (1..=3).map(|n| vote(n, VoteKind::Approve, 10)).collect();
        e.observe(&votes, ts(101));
        e.try_resolve(&params(), ts(101));

        let mut more = votes.clone();
        more.push(vote(4, VoteKind::Reject, 1_000));
        e.observe(&more, ts(102));
        assert_eq!(e.tally.distinct_voters, 3);
        assert_eq!(e.tally.weighted_reject, 0);
    }

    #[test]
    fn status_serializes_state_in_snake_case() {
        let e = Election::new(WorkUnitId::new("wu"), ts(1));
        let json = serde_json::to_string(&e.status()).unwrap();
        assert!(json.contains("\"open\""));
    }
}
