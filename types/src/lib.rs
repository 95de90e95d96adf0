//! Fundamental types for the attest validation ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identifiers, digests, timestamps, vote/outcome enums, work units, and the
//! consensus tunables.

pub mod hash;
pub mod ids;
pub mod params;
pub mod signature;
pub mod state;
pub mod time;
pub mod work_unit;

pub use hash::ActivityHash;
pub use ids::{LedgerId, ValidatorId, VoteId, WorkUnitId};
pub use params::{ApprovalThreshold, ConsensusParams, ContestedPolicy, ParamsError};
pub use signature::Signature;
pub use state::{Outcome, RecordStatus, VoteKind};
pub use time::{Clock, SystemClock, Timestamp};
pub use work_unit::WorkUnit;
