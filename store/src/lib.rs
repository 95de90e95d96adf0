//! Stored entities and abstract storage traits.
//!
//! Every storage backend (the in-process memory backend, test doubles)
//! implements these traits. The rest of the codebase depends only on the traits.

pub mod error;
pub mod ledger;
pub mod validation_record;
pub mod validator;
pub mod work_unit;

pub use error::StoreError;
pub use ledger::{ImmutableRecord, LedgerStore, RecordKind, VerificationProof};
pub use validation_record::{ValidationRecord, ValidationRecordStore};
pub use validator::{Validator, ValidatorStore};
pub use work_unit::WorkUnitStore;
