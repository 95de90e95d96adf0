//! Validation record storage trait.

use crate::StoreError;
use attest_types::{RecordStatus, Timestamp, ValidatorId, VoteId, VoteKind, WorkUnitId};
use serde::{Deserialize, Serialize};

/// One validator's vote on one work unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub id: VoteId,
    pub work_unit: WorkUnitId,
    pub validator: ValidatorId,
    pub vote: VoteKind,
    /// Stake committed to this vote.
    pub stake: u64,
    pub status: RecordStatus,
    pub created_at: Timestamp,
}

/// Trait for validation record storage.
///
/// At most one record exists per `(work_unit, validator)` pair.
pub trait ValidationRecordStore: Send + Sync {
    fn next_vote_id(&self) -> Result<VoteId, StoreError>;

    /// Insert a new record. Fails with [`StoreError::Duplicate`] if the
    /// validator already has a record for this work unit; the existing
    /// record is left untouched. The check and the insert are atomic.
    fn insert_record(&self, record: &ValidationRecord) -> Result<(), StoreError>;

    fn get_record(&self, id: VoteId) -> Result<ValidationRecord, StoreError>;

    /// Records for a work unit in submission order.
    fn records_for_work_unit(&self, work_unit: &WorkUnitId)
        -> Result<Vec<ValidationRecord>, StoreError>;

    /// Set the status of every record for a work unit. Returns how many changed.
    fn set_status(&self, work_unit: &WorkUnitId, status: RecordStatus) -> Result<usize, StoreError>;
}
