use attest_types::ValidatorId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("insufficient stake: needed {needed}, provided {provided}")]
    InsufficientStake { needed: u64, provided: u64 },

    #[error("unknown validator {0}")]
    UnknownValidator(ValidatorId),

    #[error("institution name must not be empty")]
    EmptyInstitution,

    #[error("reputation delta must be finite, got {0}")]
    InvalidDelta(f64),

    #[error("store error: {0}")]
    Store(#[from] attest_store::StoreError),
}
