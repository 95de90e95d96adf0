//! Ledger entry type and the append-only ledger storage trait.

use crate::StoreError;
use attest_types::{ActivityHash, LedgerId, Signature, Timestamp, ValidatorId, WorkUnitId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a ledger entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A single validator's vote.
    ValidationActivity,
    /// The resolution of a work unit.
    ConsensusDecision,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationActivity => "validation_activity",
            Self::ConsensusDecision => "consensus_decision",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the independent check run after an entry is persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationProof {
    /// Stored payload re-hashed to `activity_hash`.
    pub payload_rehashed: bool,
    /// `previous_hash` matched the predecessor (or the genesis sentinel).
    pub link_checked: bool,
    /// Merkle root recomputed from the payload.
    pub merkle_checked: bool,
    /// Signature re-derived from the signer snapshots in the payload.
    pub signature_checked: bool,
    pub predecessor: Option<LedgerId>,
    pub checked_at: Timestamp,
}

impl VerificationProof {
    pub fn passed(&self) -> bool {
        self.payload_rehashed
            && self.link_checked
            && self.merkle_checked
            && self.signature_checked
    }
}

/// One append-only ledger entry.
///
/// Only `verified`, `proof` and `last_checked` change after creation; the
/// hash fields are immutable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImmutableRecord {
    pub id: LedgerId,
    pub kind: RecordKind,
    pub work_unit: WorkUnitId,
    /// Canonical JSON encoding of the payload; `activity_hash` is its digest.
    pub payload: String,
    pub activity_hash: ActivityHash,
    pub previous_hash: ActivityHash,
    pub merkle_root: ActivityHash,
    pub signature: Signature,
    pub participants: Vec<ValidatorId>,
    pub reputation_delta: f64,
    pub stake_delta: i64,
    pub verified: bool,
    pub proof: Option<VerificationProof>,
    pub created_at: Timestamp,
    pub last_checked: Option<Timestamp>,
}

/// Trait for ledger storage.
///
/// Implementations must reject an append whose id is not exactly one past
/// the current tail, and must never expose a partially written entry.
pub trait LedgerStore: Send + Sync {
    fn append(&self, record: &ImmutableRecord) -> Result<(), StoreError>;
    fn get(&self, id: LedgerId) -> Result<ImmutableRecord, StoreError>;

    /// Id and activity hash of the last entry, `None` for an empty ledger.
    fn tail(&self) -> Result<Option<(LedgerId, ActivityHash)>, StoreError>;

    fn len(&self) -> Result<u64, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        self.len().map(|n| n == 0)
    }

    /// Entries with ids in `from..=to`, in id order.
    fn range(&self, from: LedgerId, to: LedgerId) -> Result<Vec<ImmutableRecord>, StoreError>;

    /// Lookup via the activity-hash index.
    fn find_by_hash(&self, hash: &ActivityHash) -> Result<Option<LedgerId>, StoreError>;

    /// Lookup via the work-unit index, in id order.
    fn ids_for_work_unit(&self, work_unit: &WorkUnitId) -> Result<Vec<LedgerId>, StoreError>;

    /// Record the post-append verification result.
    fn set_verified(&self, id: LedgerId, proof: &VerificationProof) -> Result<(), StoreError>;

    fn set_last_checked(&self, id: LedgerId, at: Timestamp) -> Result<(), StoreError>;

    /// Every entry in id order, optionally filtered by kind.
    fn list(&self, kind: Option<RecordKind>) -> Result<Vec<ImmutableRecord>, StoreError>;
}
