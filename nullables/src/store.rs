//! Nullable ledger store: an in-memory ledger whose appends can be made to fail.

use attest_store::{ImmutableRecord, LedgerStore, RecordKind, StoreError, VerificationProof};
use attest_store_memory::MemoryLedgerStore;
use attest_types::{ActivityHash, LedgerId, Timestamp, WorkUnitId};
use std::sync::atomic::{AtomicBool, Ordering};

/// Delegates to a [`MemoryLedgerStore`]; while failing, every append returns
/// a backend error without touching the inner store. Recording verification
/// results can be made to fail separately.
#[derive(Default)]
pub struct FailingLedgerStore {
    inner: MemoryLedgerStore,
    failing: AtomicBool,
    failing_verification: AtomicBool,
}

impl FailingLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make `set_verified` fail while appends still succeed.
    pub fn set_failing_verification(&self, failing: bool) {
        self.failing_verification.store(failing, Ordering::SeqCst);
    }
}

impl LedgerStore for FailingLedgerStore {
    fn append(&self, record: &ImmutableRecord) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected append failure".into()));
        }
        self.inner.append(record)
    }

    fn get(&self, id: LedgerId) -> Result<ImmutableRecord, StoreError> {
        self.inner.get(id)
    }

    fn tail(&self) -> Result<Option<(LedgerId, ActivityHash)>, StoreError> {
        self.inner.tail()
    }

    fn len(&self) -> Result<u64, StoreError> {
        self.inner.len()
    }

    fn range(&self, from: LedgerId, to: LedgerId) -> Result<Vec<ImmutableRecord>, StoreError> {
        self.inner.range(from, to)
    }

    fn find_by_hash(&self, hash: &ActivityHash) -> Result<Option<LedgerId>, StoreError> {
        self.inner.find_by_hash(hash)
    }

    fn ids_for_work_unit(&self, work_unit: &WorkUnitId) -> Result<Vec<LedgerId>, StoreError> {
        self.inner.ids_for_work_unit(work_unit)
    }

    fn set_verified(&self, id: LedgerId, proof: &VerificationProof) -> Result<(), StoreError> {
        if self.failing_verification.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected verification write failure".into()));
        }
        self.inner.set_verified(id, proof)
    }

    fn set_last_checked(&self, id: LedgerId, at: Timestamp) -> Result<(), StoreError> {
        self.inner.set_last_checked(id, at)
    }

    fn list(&self, kind: Option<RecordKind>) -> Result<Vec<ImmutableRecord>, StoreError> {
        self.inner.list(kind)
    }
}
