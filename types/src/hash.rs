//! 256-bit digest used for activity hashes, chain links and merkle roots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte digest identifying a ledger payload.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActivityHash([u8; 32]);

impl Default for ActivityHash {
    fn default() -> Self {
        Self::GENESIS
    }
}

impl ActivityHash {
    pub const ZERO: Self = Self([0u8; 32]);

    /// Sentinel stored as `previous_hash` of the first entry on a chain.
    pub const GENESIS: Self = Self::ZERO;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Lowercase hex rendering (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Debug for ActivityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActivityHash({}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for ActivityHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

// Inline hex codec to avoid adding the `hex` crate as a dependency of types.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 || !s.is_ascii() {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_zero() {
        assert!(ActivityHash::GENESIS.is_zero());
        assert_eq!(ActivityHash::default(), ActivityHash::GENESIS);
    }

    #[test]
    fn hex_roundtrip() {
        let h = ActivityHash::new([0xAB; 32]);
        let s = h.to_hex();
        assert_eq!(s.len(), 64);
        assert_eq!(ActivityHash::from_hex(&s), Some(h));
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(ActivityHash::from_hex("abc").is_none());
        assert!(ActivityHash::from_hex(&"zz".repeat(32)).is_none());
        assert!(ActivityHash::from_hex(&"00".repeat(31)).is_none());
    }

    #[test]
    fn debug_is_abbreviated() {
        let h = ActivityHash::new([0x01; 32]);
        assert_eq!(format!("{:?}", h), "ActivityHash(01010101\u{2026})");
    }
}
