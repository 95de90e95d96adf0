use proptest::prelude::*;

use attest_types::{ActivityHash, ApprovalThreshold, LedgerId, Timestamp};

proptest! {
    /// ActivityHash roundtrip: new -> as_bytes produces identical bytes.
    #[test]
    fn activity_hash_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = ActivityHash::new(bytes);
        prop_assert_eq!(hash.as_bytes(), &bytes);
    }

    /// Hex rendering parses back to the same digest.
    #[test]
    fn activity_hash_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = ActivityHash::new(bytes);
        prop_assert_eq!(ActivityHash::from_hex(&hash.to_hex()), Some(hash));
    }

    /// ActivityHash bincode serialization roundtrip.
    #[test]
    fn activity_hash_bincode_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let hash = ActivityHash::new(bytes);
        let encoded = bincode::serialize(&hash).unwrap();
        let decoded: ActivityHash = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, hash);
    }

    /// Ledger ids order the same way as their raw values.
    #[test]
    fn ledger_id_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        prop_assert_eq!(LedgerId::new(a) <= LedgerId::new(b), a <= b);
    }

    /// Two-thirds threshold agrees with exact rational comparison.
    #[test]
    fn two_thirds_matches_rational(part in 0u64..1_000_000, extra in 0u64..1_000_000) {
        let total = part as u128 + extra as u128;
        let expected = total > 0 && 3 * part as u128 >= 2 * total;
        prop_assert_eq!(ApprovalThreshold::TWO_THIRDS.is_met(part as u128, total), expected);
    }

    /// Timestamp elapsed_since: elapsed_since(now) = now - self.
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        prop_assert_eq!(t.elapsed_since(Timestamp::new(base + offset)), offset);
    }
}
