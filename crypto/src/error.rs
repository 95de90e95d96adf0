use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("payload cannot be canonicalized: {0}")]
    InvalidPayload(String),

    #[error("merkle root requested over an empty payload set")]
    EmptyMerkleSet,

    #[error("signature requested with no signers")]
    NoSigners,
}

impl From<serde_json::Error> for CryptoError {
    fn from(e: serde_json::Error) -> Self {
        CryptoError::InvalidPayload(e.to_string())
    }
}
