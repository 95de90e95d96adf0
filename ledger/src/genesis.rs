//! The chain origin.
//!
//! There is no genesis entry. The first appended entry has id 1 and links to
//! the all-zero sentinel hash.

use attest_types::{ActivityHash, LedgerId};

/// `previous_hash` of the first entry.
pub const GENESIS_HASH: ActivityHash = ActivityHash::GENESIS;

/// Id assigned to the first entry.
pub const FIRST_ID: LedgerId = LedgerId::new(1);

/// Id the next append receives given the current tail.
pub fn next_id(tail: Option<LedgerId>) -> LedgerId {
    tail.map_or(FIRST_ID, |id| id.next())
}

/// Hash the next append links to given the current tail.
pub fn link_target(tail: Option<ActivityHash>) -> ActivityHash {
    tail.unwrap_or(GENESIS_HASH)
}
