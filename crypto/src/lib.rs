//! Hash and signature primitives for the attest ledger.
//!
//! - **Blake2b-256** for every digest (activity hashes, chain links, merkle nodes)
//! - **Canonical JSON** payload encoding so hashing is independent of field order
//! - **Merkle roots** over one or many payloads
//! - **Signature fragments** derived per signer from the payload hash
//!
//! Everything here is pure and side-effect free.

pub mod error;
pub mod hash;
pub mod merkle;
pub mod signature;

pub use error::CryptoError;
pub use hash::{blake2b_256, blake2b_256_multi, canonical_bytes, canonicalize, hash_payload};
pub use merkle::{merkle_root, merkle_root_of_hashes};
pub use signature::{sign_hash, sign_payload, signature_fragment, verify_signature, Signer};
