//! Ledger export for offline audit.
//!
//! An export carries every entry verbatim plus a Blake2b digest over the entry
//! hashes, so a truncated or reordered file is caught before the chain itself
//! is verified.

use attest_crypto::blake2b_256_multi;
use attest_store::ImmutableRecord;
use attest_types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::verifier::{verify_entries, IntegrityReport};
use crate::LedgerError;

const SNAPSHOT_VERSION: u32 = 1;

/// Outcome of auditing an export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotAudit {
    /// The export's digest matches its entries.
    pub digest_matches: bool,
    pub report: IntegrityReport,
}

impl SnapshotAudit {
    pub fn is_valid(&self) -> bool {
        self.digest_matches && self.report.is_valid
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub exported_at: Timestamp,
    /// Digest over the activity hashes of `entries`, in order.
    pub digest: [u8; 32],
    pub entries: Vec<ImmutableRecord>,
}

impl LedgerSnapshot {
    pub fn create(entries: Vec<ImmutableRecord>, exported_at: Timestamp) -> Self {
        let digest = digest_of(&entries);
        Self {
            version: SNAPSHOT_VERSION,
            exported_at,
            digest,
            entries,
        }
    }

    /// Whether the digest still matches the entries.
    pub fn verify(&self) -> bool {
        self.digest == digest_of(&self.entries)
    }

    /// Serialize the snapshot to bytes (bincode).
    pub fn to_bytes(&self) -> Result<Vec<u8>, LedgerError> {
        bincode::serialize(self).map_err(|e| LedgerError::Snapshot(e.to_string()))
    }

    /// Deserialize a snapshot, rejecting unknown versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LedgerError> {
        let snapshot: Self =
            bincode::deserialize(bytes).map_err(|e| LedgerError::Snapshot(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(LedgerError::Snapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Check the digest and walk the exported chain. Never fails: every
    /// problem found is part of the returned audit.
    pub fn audit(&self, checked_at: Timestamp) -> SnapshotAudit {
        SnapshotAudit {
            digest_matches: self.verify(),
            report: verify_entries(&self.entries, checked_at),
        }
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

fn digest_of(entries: &[ImmutableRecord]) -> [u8; 32] {
    let parts: Vec<&[u8]> = entries.iter().map(|e| e.activity_hash.as_bytes().as_slice()).collect();
    blake2b_256_multi(&parts)
}
