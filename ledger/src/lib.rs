//! Hash-chained, append-only audit ledger.
//!
//! Each entry links to its predecessor's activity hash; the first links to the
//! all-zero sentinel. Entries are only ever appended, and a chain built solely
//! through [`ImmutableLedger`] always passes [`ChainVerifier::verify_chain`].

pub mod check;
pub mod error;
pub mod genesis;
pub mod ledger;
pub mod payload;
pub mod snapshot;
pub mod verifier;

pub use check::{check_entry, EntryCheck};
pub use error::LedgerError;
pub use genesis::{FIRST_ID, GENESIS_HASH};
pub use ledger::ImmutableLedger;
pub use payload::{ActivityPayload, DecisionPayload, LedgerPayload, ParticipantEntry, ValidatorSnapshot};
pub use snapshot::{LedgerSnapshot, SnapshotAudit};
pub use verifier::{verify_entries, ChainVerifier, IntegrityReport};
