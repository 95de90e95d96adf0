//! Per-entry integrity checks shared by post-append verification and the
//! chain verifier.

use attest_crypto::{blake2b_256, verify_signature};
use attest_store::{ImmutableRecord, VerificationProof};
use attest_types::{ActivityHash, LedgerId, Timestamp};

use crate::payload::LedgerPayload;

/// What one entry looked like under inspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryCheck {
    /// `previous_hash` equals the expected predecessor hash.
    pub link_ok: bool,
    /// Stored payload text still hashes to `activity_hash`.
    pub content_ok: bool,
    /// Payload parses and agrees with the entry's header fields.
    pub header_ok: bool,
    pub merkle_ok: bool,
    pub signature_ok: bool,
}

impl EntryCheck {
    /// Any failure other than the chain link.
    pub fn is_tampered(&self) -> bool {
        !(self.content_ok && self.header_ok && self.merkle_ok && self.signature_ok)
    }

    pub fn into_proof(self, predecessor: Option<LedgerId>, checked_at: Timestamp) -> VerificationProof {
        VerificationProof {
            payload_rehashed: self.content_ok && self.header_ok,
            link_checked: self.link_ok,
            merkle_checked: self.merkle_ok,
            signature_checked: self.signature_ok,
            predecessor,
            checked_at,
        }
    }
}

/// Inspect an entry against the hash it must link to.
pub fn check_entry(record: &ImmutableRecord, expected_previous: &ActivityHash) -> EntryCheck {
    let link_ok = record.previous_hash == *expected_previous;
    let content_ok = ActivityHash::new(blake2b_256(record.payload.as_bytes())) == record.activity_hash;

    let Ok(payload) = LedgerPayload::decode(&record.payload) else {
        return EntryCheck {
            link_ok,
            content_ok,
            header_ok: false,
            merkle_ok: false,
            signature_ok: false,
        };
    };

    let header_ok = payload.kind() == record.kind
        && payload.ledger_id() == record.id
        && payload.previous_hash() == record.previous_hash
        && payload.work_unit() == &record.work_unit
        && payload.participants() == record.participants
        && payload.stake_delta() == record.stake_delta
        && payload.reputation_delta().to_bits() == record.reputation_delta.to_bits();
    let merkle_ok = payload
        .merkle_root()
        .map(|root| root == record.merkle_root)
        .unwrap_or(false);
    let signature_ok = verify_signature(&record.activity_hash, &payload.signers(), &record.signature);

    EntryCheck {
        link_ok,
        content_ok,
        header_ok,
        merkle_ok,
        signature_ok,
    }
}
