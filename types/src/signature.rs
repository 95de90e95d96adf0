//! Multi-signer ledger signature.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between per-signer fragments.
pub const FRAGMENT_SEPARATOR: char = '.';

/// Ordered join of one hex fragment per participating validator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(String);

impl Signature {
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = String::new();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                out.push(FRAGMENT_SEPARATOR);
            }
            out.push_str(fragment.as_ref());
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fragments in signer order.
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.0.split(FRAGMENT_SEPARATOR).filter(|s| !s.is_empty())
    }

    pub fn signer_count(&self) -> usize {
        self.fragments().count()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_preserve_order() {
        let sig = Signature::from_fragments(["aa", "bb", "cc"]);
        assert_eq!(sig.as_str(), "aa.bb.cc");
        assert_eq!(sig.fragments().collect::<Vec<_>>(), vec!["aa", "bb", "cc"]);
        assert_eq!(sig.signer_count(), 3);
    }

    #[test]
    fn empty_signature_has_no_fragments() {
        assert_eq!(Signature::default().signer_count(), 0);
    }
}
