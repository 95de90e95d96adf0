//! Stake-weighted consensus over work units.
//!
//! - [`VoteBook`]: one pending vote per validator per work unit
//! - [`Election`]: per-unit state machine `Open → PendingConsensus → Resolved`
//! - [`ConsensusEngine`]: routes votes, resolves units exactly once and feeds
//!   outcomes back into validator reputation

pub mod election;
pub mod engine;
pub mod error;
pub mod reputation;
pub mod vote_book;

pub use election::{ConsensusState, ConsensusStatus, Election, ResolutionRule, Tally};
pub use engine::{ConsensusEngine, Resolution, VoteReceipt};
pub use error::ConsensusError;
pub use reputation::{delta_magnitude, signed_delta, ReputationChange};
pub use vote_book::VoteBook;
