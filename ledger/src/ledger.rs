//! The append-only, hash-chained ledger.

use std::sync::{Arc, Mutex, MutexGuard};

use attest_consensus::Resolution;
use attest_crypto::{blake2b_256, sign_hash};
use attest_store::{
    ImmutableRecord, LedgerStore, RecordKind, StoreError, ValidationRecord, Validator,
};
use attest_types::{ActivityHash, Clock, LedgerId, WorkUnitId};
use tracing::{error, info, warn};

use crate::check::check_entry;
use crate::genesis::{link_target, next_id, GENESIS_HASH};
use crate::payload::LedgerPayload;
use crate::LedgerError;

/// Single writer over a [`LedgerStore`].
///
/// Every append reads the tail, builds and hashes the payload, and persists the
/// entry while holding `append_lock`, so two appends can never link to the
/// same predecessor. After persisting, the entry is re-read from the store and
/// checked independently before it is marked verified.
pub struct ImmutableLedger {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    append_lock: Mutex<()>,
}

impl ImmutableLedger {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            append_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Record one vote together with the voter's state at vote time.
    pub fn append_validation_activity(
        &self,
        record: &ValidationRecord,
        validator: &Validator,
    ) -> Result<ImmutableRecord, LedgerError> {
        self.append(|id, previous| Ok(LedgerPayload::activity(id, previous, record, validator)))
    }

    /// Record a work unit's resolution, signed by every participant in
    /// registration order.
    pub fn append_consensus_decision(
        &self,
        resolution: &Resolution,
    ) -> Result<ImmutableRecord, LedgerError> {
        self.append(|id, previous| LedgerPayload::decision(id, previous, resolution))
    }

    pub fn get(&self, id: LedgerId) -> Result<ImmutableRecord, LedgerError> {
        Ok(self.store.get(id)?)
    }

    /// All entries in id order, optionally of one kind.
    pub fn list(&self, kind: Option<RecordKind>) -> Result<Vec<ImmutableRecord>, LedgerError> {
        Ok(self.store.list(kind)?)
    }

    pub fn find_by_hash(&self, hash: &ActivityHash) -> Result<Option<ImmutableRecord>, LedgerError> {
        match self.store.find_by_hash(hash)? {
            Some(id) => Ok(Some(self.store.get(id)?)),
            None => Ok(None),
        }
    }

    pub fn records_for_work_unit(
        &self,
        work_unit: &WorkUnitId,
    ) -> Result<Vec<ImmutableRecord>, LedgerError> {
        self.store
            .ids_for_work_unit(work_unit)?
            .into_iter()
            .map(|id| self.get(id))
            .collect()
    }

    pub fn len(&self) -> Result<u64, LedgerError> {
        Ok(self.store.len()?)
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.store.is_empty()?)
    }

    fn append<F>(&self, build: F) -> Result<ImmutableRecord, LedgerError>
    where
        F: FnOnce(LedgerId, ActivityHash) -> Result<LedgerPayload, LedgerError>,
    {
        let _guard = self.write_guard()?;

        let tail = self.store.tail()?;
        let id = next_id(tail.map(|(id, _)| id));
        let previous_hash = link_target(tail.map(|(_, hash)| hash));

        let payload = build(id, previous_hash)?;
        let text = payload.encode()?;
        let activity_hash = ActivityHash::new(blake2b_256(text.as_bytes()));
        let merkle_root = payload.merkle_root()?;
        let signers = payload.signers();
        let signature = sign_hash(&activity_hash, &signers)?;

        let entry = ImmutableRecord {
            id,
            kind: payload.kind(),
            work_unit: payload.work_unit().clone(),
            payload: text,
            activity_hash,
            previous_hash,
            merkle_root,
            signature,
            participants: signers.iter().map(|s| s.id).collect(),
            reputation_delta: payload.reputation_delta(),
            stake_delta: payload.stake_delta(),
            verified: false,
            proof: None,
            created_at: self.clock.now(),
            last_checked: None,
        };
        self.store.append(&entry)?;

        // The entry is on the chain from here on; a failed check leaves it unverified.
        let stored = match self.verify_appended(id, tail.map(|(id, _)| id)) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(%id, error = %e, "post-append verification could not run");
                entry
            }
        };
        info!(
            %id,
            kind = %stored.kind,
            work_unit = %stored.work_unit,
            hash = %stored.activity_hash,
            verified = stored.verified,
            "ledger entry appended"
        );
        Ok(stored)
    }

    /// Re-read a just-written entry and its predecessor and check the entry
    /// from scratch.
    fn verify_appended(
        &self,
        id: LedgerId,
        predecessor: Option<LedgerId>,
    ) -> Result<ImmutableRecord, LedgerError> {
        let stored = self.store.get(id)?;
        let expected_previous = match predecessor {
            Some(prev) => self.store.get(prev)?.activity_hash,
            None => GENESIS_HASH,
        };
        let check = check_entry(&stored, &expected_previous);
        let proof = check.into_proof(predecessor, self.clock.now());
        if !proof.passed() {
            error!(%id, ?check, "post-append verification failed");
        }
        self.store.set_verified(id, &proof)?;
        Ok(self.store.get(id)?)
    }

    fn write_guard(&self) -> Result<MutexGuard<'_, ()>, LedgerError> {
        self.append_lock
            .lock()
            .map_err(|_| LedgerError::Storage(StoreError::Backend("ledger append lock poisoned".into())))
    }
}
