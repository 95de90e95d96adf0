//! Merkle root aggregation.
//!
//! Leaves are payload hashes. Each level combines adjacent pairs; an odd node
//! at the end of a level is paired with itself. A single leaf is its own root,
//! so the root of one payload equals `hash_payload(payload)`.

use attest_types::ActivityHash;
use serde::Serialize;

use crate::hash::{blake2b_256_multi, hash_payload};
use crate::CryptoError;

/// Domain tag for interior nodes, so a node can never collide with a leaf.
const NODE_TAG: &[u8] = &[0x01];

/// Merkle root over a set of payloads, in the given order.
pub fn merkle_root<T: Serialize>(payloads: &[T]) -> Result<ActivityHash, CryptoError> {
    let leaves = payloads
        .iter()
        .map(|p| hash_payload(p))
        .collect::<Result<Vec<_>, _>>()?;
    merkle_root_of_hashes(&leaves).ok_or(CryptoError::EmptyMerkleSet)
}

/// Merkle root over precomputed leaf hashes. `None` for an empty set.
pub fn merkle_root_of_hashes(leaves: &[ActivityHash]) -> Option<ActivityHash> {
    if leaves.is_empty() {
        return None;
    }
    let mut level: Vec<ActivityHash> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                ActivityHash::new(blake2b_256_multi(&[
                    NODE_TAG,
                    left.as_bytes(),
                    right.as_bytes(),
                ]))
            })
            .collect();
    }
    level.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(b: u8) -> ActivityHash {
        ActivityHash::new([b; 32])
    }

    fn node(l: &ActivityHash, r: &ActivityHash) -> ActivityHash {
        ActivityHash::new(blake2b_256_multi(&[NODE_TAG, l.as_bytes(), r.as_bytes()]))
    }

    #[test]
    fn single_payload_root_is_payload_hash() {
        let p = json!({"work_unit": "wu-1", "vote": "approve"});
        assert_eq!(merkle_root(&[p.clone()]).unwrap(), hash_payload(&p).unwrap());
    }

    #[test]
    fn empty_set_is_an_error() {
        let empty: [serde_json::Value; 0] = [];
        assert!(matches!(merkle_root(&empty), Err(CryptoError::EmptyMerkleSet)));
        assert!(merkle_root_of_hashes(&[]).is_none());
    }

    #[test]
    fn two_leaves_combine_pairwise() {
        let (a, b) = (leaf(1), leaf(2));
        assert_eq!(merkle_root_of_hashes(&[a, b]), Some(node(&a, &b)));
    }

    #[test]
    fn odd_level_duplicates_last_node() {
        let (a, b, c) = (leaf(1), leaf(2), leaf(3));
        let expected = node(&node(&a, &b), &node(&c, &c));
        assert_eq!(merkle_root_of_hashes(&[a, b, c]), Some(expected));
    }

    #[test]
    fn order_matters() {
        let (a, b) = (leaf(1), leaf(2));
        assert_ne!(
            merkle_root_of_hashes(&[a, b]),
            merkle_root_of_hashes(&[b, a])
        );
    }
}
