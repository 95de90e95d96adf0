//! In-process storage backend.
//!
//! Implements every storage trait from `attest-store` on top of mutex-guarded
//! maps. All stores are `Send + Sync` and safe to share behind `Arc`.

pub mod ledger;
pub mod validation_record;
pub mod validator;
pub mod work_unit;

pub use ledger::MemoryLedgerStore;
pub use validation_record::MemoryValidationRecordStore;
pub use validator::MemoryValidatorStore;
pub use work_unit::MemoryWorkUnitStore;

use attest_store::StoreError;
use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, mapping poisoning to a backend error.
pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend(format!("{what} lock poisoned")))
}
