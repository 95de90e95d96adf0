//! In-memory append-only ledger table.
//!
//! Entries are keyed by ledger id with secondary indexes on activity hash and
//! work unit. An append is validated and applied under a single lock, so a
//! failed append leaves no trace.

use attest_store::{ImmutableRecord, LedgerStore, RecordKind, StoreError, VerificationProof};
use attest_types::{ActivityHash, LedgerId, Timestamp, WorkUnitId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::trace;

use crate::lock;

#[derive(Default)]
struct Table {
    entries: BTreeMap<LedgerId, ImmutableRecord>,
    by_hash: HashMap<ActivityHash, LedgerId>,
    by_work_unit: HashMap<WorkUnitId, Vec<LedgerId>>,
}

impl Table {
    fn tail_id(&self) -> Option<LedgerId> {
        self.entries.keys().next_back().copied()
    }

    fn get_mut(&mut self, id: LedgerId) -> Result<&mut ImmutableRecord, StoreError> {
        self.entries
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[derive(Default)]
pub struct MemoryLedgerStore {
    table: Mutex<Table>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a previously exported ledger, re-validating id sequence.
    pub fn from_records(records: Vec<ImmutableRecord>) -> Result<Self, StoreError> {
        let store = Self::new();
        for record in &records {
            store.append(record)?;
        }
        Ok(store)
    }

    /// Mutate a stored entry in place, bypassing every append-only guarantee.
    ///
    /// Indexes are not updated. Exists only to exercise the integrity verifier.
    #[cfg(feature = "fault-injection")]
    pub fn tamper<F>(&self, id: LedgerId, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut ImmutableRecord),
    {
        let mut table = lock(&self.table, "ledger")?;
        f(table.get_mut(id)?);
        tracing::warn!(%id, "ledger entry tampered");
        Ok(())
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn append(&self, record: &ImmutableRecord) -> Result<(), StoreError> {
        let mut table = lock(&self.table, "ledger")?;
        let expected = table.tail_id().map_or(LedgerId::new(1), |t| t.next());
        if record.id != expected {
            return Err(StoreError::OutOfSequence {
                expected: expected.get(),
                got: record.id.get(),
            });
        }
        if table.by_hash.contains_key(&record.activity_hash) {
            return Err(StoreError::Duplicate(format!(
                "activity hash {}",
                record.activity_hash
            )));
        }
        table.by_hash.insert(record.activity_hash, record.id);
        table
            .by_work_unit
            .entry(record.work_unit.clone())
            .or_default()
            .push(record.id);
        table.entries.insert(record.id, record.clone());
        trace!(id = %record.id, kind = %record.kind, "ledger entry stored");
        Ok(())
    }

    fn get(&self, id: LedgerId) -> Result<ImmutableRecord, StoreError> {
        lock(&self.table, "ledger")?
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn tail(&self) -> Result<Option<(LedgerId, ActivityHash)>, StoreError> {
        Ok(lock(&self.table, "ledger")?
            .entries
            .values()
            .next_back()
            .map(|r| (r.id, r.activity_hash)))
    }

    fn len(&self) -> Result<u64, StoreError> {
        Ok(lock(&self.table, "ledger")?.entries.len() as u64)
    }

    fn range(&self, from: LedgerId, to: LedgerId) -> Result<Vec<ImmutableRecord>, StoreError> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(lock(&self.table, "ledger")?
            .entries
            .range(from..=to)
            .map(|(_, r)| r.clone())
            .collect())
    }

    fn find_by_hash(&self, hash: &ActivityHash) -> Result<Option<LedgerId>, StoreError> {
        Ok(lock(&self.table, "ledger")?.by_hash.get(hash).copied())
    }

    fn ids_for_work_unit(&self, work_unit: &WorkUnitId) -> Result<Vec<LedgerId>, StoreError> {
        Ok(lock(&self.table, "ledger")?
            .by_work_unit
            .get(work_unit)
            .cloned()
            .unwrap_or_default())
    }

    fn set_verified(&self, id: LedgerId, proof: &VerificationProof) -> Result<(), StoreError> {
        let mut table = lock(&self.table, "ledger")?;
        let entry = table.get_mut(id)?;
        entry.verified = proof.passed();
        entry.last_checked = Some(proof.checked_at);
        entry.proof = Some(proof.clone());
        Ok(())
    }

    fn set_last_checked(&self, id: LedgerId, at: Timestamp) -> Result<(), StoreError> {
        let mut table = lock(&self.table, "ledger")?;
        table.get_mut(id)?.last_checked = Some(at);
        Ok(())
    }

    fn list(&self, kind: Option<RecordKind>) -> Result<Vec<ImmutableRecord>, StoreError> {
        Ok(lock(&self.table, "ledger")?
            .entries
            .values()
            .filter(|r| kind.map_or(true, |k| r.kind == k))
            .cloned()
            .collect())
    }
}
