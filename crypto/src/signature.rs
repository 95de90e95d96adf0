//! Per-signer signature fragments.
//!
//! Each fragment mixes the payload hash with the signer's id, reputation and
//! stake at signing time. The signature is the fragments joined in signer
//! presentation order, so anyone holding the payload and the signer snapshots
//! can re-derive and compare it.

use attest_types::{ActivityHash, Signature, ValidatorId};
use serde::{Deserialize, Serialize};

use crate::hash::{blake2b_256_multi, hash_payload};
use crate::CryptoError;

const FRAGMENT_DOMAIN: &[u8] = b"attest/signature-fragment/v1";

/// Fragment length in bytes (rendered as twice as many hex characters).
const FRAGMENT_LEN: usize = 16;

/// Signer attributes captured at signing time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signer {
    pub id: ValidatorId,
    pub reputation: f64,
    pub stake: u64,
}

/// Derive one signer's hex fragment over a payload hash.
pub fn signature_fragment(payload_hash: &ActivityHash, signer: &Signer) -> String {
    let digest = blake2b_256_multi(&[
        FRAGMENT_DOMAIN,
        payload_hash.as_bytes(),
        &signer.id.get().to_le_bytes(),
        &signer.reputation.to_bits().to_le_bytes(),
        &signer.stake.to_le_bytes(),
    ]);
    hex::encode(&digest[..FRAGMENT_LEN])
}

/// Sign an already-computed payload hash.
pub fn sign_hash(payload_hash: &ActivityHash, signers: &[Signer]) -> Result<Signature, CryptoError> {
    if signers.is_empty() {
        return Err(CryptoError::NoSigners);
    }
    Ok(Signature::from_fragments(
        signers.iter().map(|s| signature_fragment(payload_hash, s)),
    ))
}

/// Hash a payload and sign it.
pub fn sign_payload<T: Serialize + ?Sized>(
    payload: &T,
    signers: &[Signer],
) -> Result<Signature, CryptoError> {
    let hash = hash_payload(payload)?;
    sign_hash(&hash, signers)
}

/// Re-derive the signature and compare.
pub fn verify_signature(payload_hash: &ActivityHash, signers: &[Signer], signature: &Signature) -> bool {
    match sign_hash(payload_hash, signers) {
        Ok(expected) => expected == *signature,
        Err(_) => false,
    }
}
