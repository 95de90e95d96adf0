//! Ledger payloads.
//!
//! A payload is everything an entry commits to: its id, the hash it links to,
//! and the activity itself, including the signer attributes needed to
//! re-derive its signature. Payloads are stored in canonical JSON form and the
//! entry's `activity_hash` is the digest of exactly that text.

use attest_consensus::{Resolution, ResolutionRule};
use attest_crypto::{canonical_bytes, hash_payload, merkle_root, CryptoError, Signer};
use attest_store::{RecordKind, ValidationRecord, Validator};
use attest_types::{
    ActivityHash, LedgerId, Outcome, Timestamp, ValidatorId, VoteId, VoteKind, WorkUnitId,
};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Validator attributes frozen into a payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSnapshot {
    pub id: ValidatorId,
    pub institution: String,
    pub stake: u64,
    pub reputation: f64,
    pub total_votes: u64,
    pub correct_votes: u64,
}

impl ValidatorSnapshot {
    pub fn signer(&self) -> Signer {
        Signer {
            id: self.id,
            reputation: self.reputation,
            stake: self.stake,
        }
    }
}

impl From<&Validator> for ValidatorSnapshot {
    fn from(v: &Validator) -> Self {
        Self {
            id: v.id,
            institution: v.institution.clone(),
            stake: v.stake,
            reputation: v.reputation,
            total_votes: v.total_votes,
            correct_votes: v.correct_votes,
        }
    }
}

/// One validator's vote, with the validator as it stood when voting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub ledger_id: LedgerId,
    pub previous_hash: ActivityHash,
    pub work_unit: WorkUnitId,
    pub vote_id: VoteId,
    pub vote: VoteKind,
    pub stake: u64,
    pub validator: ValidatorSnapshot,
    pub voted_at: Timestamp,
}

/// A participant's share in a decision. These are the merkle leaves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    /// State after reputation feedback was applied.
    pub validator: ValidatorSnapshot,
    pub vote: VoteKind,
    pub stake: u64,
    pub was_correct: bool,
    pub reputation_delta: f64,
}

/// The resolution of a work unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionPayload {
    pub ledger_id: LedgerId,
    pub previous_hash: ActivityHash,
    pub work_unit: WorkUnitId,
    pub outcome: Outcome,
    pub rule: ResolutionRule,
    pub declared_value: f64,
    pub weighted_approve: u64,
    pub weighted_reject: u64,
    /// Registration order.
    pub participants: Vec<ParticipantEntry>,
    pub resolved_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerPayload {
    ValidationActivity(ActivityPayload),
    ConsensusDecision(DecisionPayload),
}

impl LedgerPayload {
    pub fn activity(
        ledger_id: LedgerId,
        previous_hash: ActivityHash,
        record: &ValidationRecord,
        validator: &Validator,
    ) -> Self {
        Self::ValidationActivity(ActivityPayload {
            ledger_id,
            previous_hash,
            work_unit: record.work_unit.clone(),
            vote_id: record.id,
            vote: record.vote,
            stake: record.stake,
            validator: ValidatorSnapshot::from(validator),
            voted_at: record.created_at,
        })
    }

    pub fn decision(
        ledger_id: LedgerId,
        previous_hash: ActivityHash,
        resolution: &Resolution,
    ) -> Result<Self, LedgerError> {
        if resolution.participants.is_empty() {
            return Err(LedgerError::NoParticipants(resolution.work_unit.to_string()));
        }
        let mut participants: Vec<ParticipantEntry> = resolution
            .participants
            .iter()
            .filter_map(|validator| {
                let change = resolution.changes.iter().find(|c| c.validator == validator.id)?;
                Some(ParticipantEntry {
                    validator: ValidatorSnapshot::from(validator),
                    vote: change.vote,
                    stake: change.stake,
                    was_correct: change.was_correct,
                    reputation_delta: change.delta,
                })
            })
            .collect();
        participants.sort_by_key(|p| p.validator.id);

        Ok(Self::ConsensusDecision(DecisionPayload {
            ledger_id,
            previous_hash,
            work_unit: resolution.work_unit.clone(),
            outcome: resolution.outcome,
            rule: resolution.rule,
            declared_value: resolution.declared_value,
            weighted_approve: saturate(resolution.tally.weighted_approve),
            weighted_reject: saturate(resolution.tally.weighted_reject),
            participants,
            resolved_at: resolution.resolved_at,
        }))
    }

    /// Parse a stored canonical payload.
    pub fn decode(text: &str) -> Result<Self, LedgerError> {
        serde_json::from_str(text).map_err(|e| LedgerError::MalformedPayload(e.to_string()))
    }

    /// Canonical JSON text, the exact input of `activity_hash`.
    pub fn encode(&self) -> Result<String, CryptoError> {
        let bytes = canonical_bytes(self)?;
        String::from_utf8(bytes).map_err(|e| CryptoError::InvalidPayload(e.to_string()))
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::ValidationActivity(_) => RecordKind::ValidationActivity,
            Self::ConsensusDecision(_) => RecordKind::ConsensusDecision,
        }
    }

    pub fn ledger_id(&self) -> LedgerId {
        match self {
            Self::ValidationActivity(p) => p.ledger_id,
            Self::ConsensusDecision(p) => p.ledger_id,
        }
    }

    pub fn previous_hash(&self) -> ActivityHash {
        match self {
            Self::ValidationActivity(p) => p.previous_hash,
            Self::ConsensusDecision(p) => p.previous_hash,
        }
    }

    pub fn work_unit(&self) -> &WorkUnitId {
        match self {
            Self::ValidationActivity(p) => &p.work_unit,
            Self::ConsensusDecision(p) => &p.work_unit,
        }
    }

    /// Signers in signing order.
    pub fn signers(&self) -> Vec<Signer> {
        match self {
            Self::ValidationActivity(p) => vec![p.validator.signer()],
            Self::ConsensusDecision(p) => p.participants.iter().map(|e| e.validator.signer()).collect(),
        }
    }

    pub fn participants(&self) -> Vec<ValidatorId> {
        self.signers().iter().map(|s| s.id).collect()
    }

    /// A vote is a single leaf, so its root equals its own hash. A decision
    /// commits to its participant entries.
    pub fn merkle_root(&self) -> Result<ActivityHash, CryptoError> {
        match self {
            Self::ValidationActivity(_) => hash_payload(self),
            Self::ConsensusDecision(p) => merkle_root(&p.participants),
        }
    }

    pub fn reputation_delta(&self) -> f64 {
        match self {
            Self::ValidationActivity(_) => 0.0,
            Self::ConsensusDecision(p) => p.participants.iter().map(|e| e.reputation_delta).sum(),
        }
    }

    /// Stake committed by a vote; approve minus reject stake for a decision.
    pub fn stake_delta(&self) -> i64 {
        match self {
            Self::ValidationActivity(p) => i64::try_from(p.stake).unwrap_or(i64::MAX),
            Self::ConsensusDecision(p) => {
                let diff = p.weighted_approve as i128 - p.weighted_reject as i128;
                diff.clamp(i64::MIN as i128, i64::MAX as i128) as i64
            }
        }
    }
}

fn saturate(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_types::RecordStatus;

    fn validator(id: u64, reputation: f64) -> Validator {
        Validator {
            id: ValidatorId::new(id),
            institution: format!("Lab {id}"),
            stake: 100,
            reputation,
            total_votes: 0,
            correct_votes: 0,
            registered_at: Timestamp::new(1),
        }
    }

    fn record(id: u64) -> ValidationRecord {
        ValidationRecord {
            id: VoteId::new(id),
            work_unit: WorkUnitId::new("wu"),
            validator: ValidatorId::new(id),
            vote: VoteKind::Approve,
            stake: 40,
            status: RecordStatus::Pending,
            created_at: Timestamp::new(10),
        }
    }

    #[test]
    fn encoded_payload_decodes_to_itself() {
        let p = LedgerPayload::activity(LedgerId::new(1), ActivityHash::ZERO, &record(1), &validator(1, 0.5));
        let text = p.encode().unwrap();
        assert!(text.contains("\"kind\":\"validation_activity\""));
        assert_eq!(LedgerPayload::decode(&text).unwrap(), p);
    }

    #[test]
    fn integral_reputation_survives_canonical_form() {
        let p = LedgerPayload::activity(LedgerId::new(1), ActivityHash::ZERO, &record(1), &validator(1, 1.0));
        let decoded = LedgerPayload::decode(&p.encode().unwrap()).unwrap();
        assert_eq!(decoded.signers()[0].reputation.to_bits(), 1.0f64.to_bits());
    }

    #[test]
    fn activity_root_is_own_hash() {
        let p = LedgerPayload::activity(LedgerId::new(3), ActivityHash::new([1; 32]), &record(2), &validator(2, 0.5));
        assert_eq!(p.merkle_root().unwrap(), hash_payload(&p).unwrap());
        assert_eq!(p.stake_delta(), 40);
        assert_eq!(p.reputation_delta(), 0.0);
        assert_eq!(p.participants(), vec![ValidatorId::new(2)]);
    }

    #[test]
    fn malformed_text_is_reported() {
        assert!(matches!(
            LedgerPayload::decode("{\"kind\":\"unknown\"}"),
            Err(LedgerError::MalformedPayload(_))
        ));
    }
}
