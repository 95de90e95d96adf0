//! In-memory validation record store.

use attest_store::{StoreError, ValidationRecord, ValidationRecordStore};
use attest_types::{RecordStatus, ValidatorId, VoteId, WorkUnitId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::lock;

#[derive(Default)]
struct Records {
    by_id: BTreeMap<VoteId, ValidationRecord>,
    /// work unit → (validator → vote id)
    by_unit: HashMap<WorkUnitId, BTreeMap<ValidatorId, VoteId>>,
}

pub struct MemoryValidationRecordStore {
    records: Mutex<Records>,
    next_id: AtomicU64,
}

impl MemoryValidationRecordStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records::default()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryValidationRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationRecordStore for MemoryValidationRecordStore {
    fn next_vote_id(&self) -> Result<VoteId, StoreError> {
        Ok(VoteId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn insert_record(&self, record: &ValidationRecord) -> Result<(), StoreError> {
        let mut records = lock(&self.records, "validation records")?;
        let voters = records.by_unit.entry(record.work_unit.clone()).or_default();
        if voters.contains_key(&record.validator) {
            return Err(StoreError::Duplicate(format!(
                "{} on {}",
                record.validator, record.work_unit
            )));
        }
        voters.insert(record.validator, record.id);
        records.by_id.insert(record.id, record.clone());
        Ok(())
    }

    fn get_record(&self, id: VoteId) -> Result<ValidationRecord, StoreError> {
        lock(&self.records, "validation records")?
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn records_for_work_unit(
        &self,
        work_unit: &WorkUnitId,
    ) -> Result<Vec<ValidationRecord>, StoreError> {
        let records = lock(&self.records, "validation records")?;
        let Some(voters) = records.by_unit.get(work_unit) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<ValidationRecord> = voters
            .values()
            .filter_map(|id| records.by_id.get(id).cloned())
            .collect();
        out.sort_by_key(|r| r.id);
        Ok(out)
    }

    fn set_status(&self, work_unit: &WorkUnitId, status: RecordStatus) -> Result<usize, StoreError> {
        let mut records = lock(&self.records, "validation records")?;
        let ids: Vec<VoteId> = records
            .by_unit
            .get(work_unit)
            .map(|voters| voters.values().copied().collect())
            .unwrap_or_default();
        let mut changed = 0;
        for id in ids {
            if let Some(record) = records.by_id.get_mut(&id) {
                if record.status != status {
                    record.status = status;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_types::{Timestamp, VoteKind};

    fn record(store: &MemoryValidationRecordStore, unit: &str, validator: u64) -> ValidationRecord {
        ValidationRecord {
            id: store.next_vote_id().unwrap(),
            work_unit: WorkUnitId::new(unit),
            validator: ValidatorId::new(validator),
            vote: VoteKind::Approve,
            stake: 100,
            status: RecordStatus::Pending,
            created_at: Timestamp::new(10),
        }
    }

    #[test]
    fn duplicate_pair_rejected_and_original_kept() {
        let store = MemoryValidationRecordStore::new();
        let first = record(&store, "wu-1", 1);
        store.insert_record(&first).unwrap();

        let mut second = record(&store, "wu-1", 1);
        second.vote = VoteKind::Reject;
        assert!(matches!(store.insert_record(&second), Err(StoreError::Duplicate(_))));

        let kept = store.records_for_work_unit(&WorkUnitId::new("wu-1")).unwrap();
        assert_eq!(kept, vec![first]);
    }

    #[test]
    fn records_ordered_by_submission() {
        let store = MemoryValidationRecordStore::new();
        // Validator 3 votes first, then validator 1.
        let a = record(&store, "wu-1", 3);
        let b = record(&store, "wu-1", 1);
        store.insert_record(&a).unwrap();
        store.insert_record(&b).unwrap();
        store.insert_record(&record(&store, "wu-2", 1)).unwrap();

        let votes = store.records_for_work_unit(&WorkUnitId::new("wu-1")).unwrap();
        assert_eq!(votes.iter().map(|r| r.validator.get()).collect::<Vec<_>>(), vec![3, 1]);
    }

    #[test]
    fn set_status_updates_only_that_unit() {
        let store = MemoryValidationRecordStore::new();
        store.insert_record(&record(&store, "wu-1", 1)).unwrap();
        store.insert_record(&record(&store, "wu-1", 2)).unwrap();
        store.insert_record(&record(&store, "wu-2", 1)).unwrap();

        let changed = store
            .set_status(&WorkUnitId::new("wu-1"), RecordStatus::Approved)
            .unwrap();
        assert_eq!(changed, 2);
        let other = store.records_for_work_unit(&WorkUnitId::new("wu-2")).unwrap();
        assert_eq!(other[0].status, RecordStatus::Pending);
    }

    #[test]
    fn unknown_unit_has_no_records() {
        let store = MemoryValidationRecordStore::new();
        assert!(store
            .records_for_work_unit(&WorkUnitId::new("nope"))
            .unwrap()
            .is_empty());
    }
}
