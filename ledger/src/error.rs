use attest_crypto::CryptoError;
use attest_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("payload error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("stored payload is unreadable: {0}")]
    MalformedPayload(String),

    #[error("consensus decision for {0} has no participants")]
    NoParticipants(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}
