use attest_registry::RegistryError;
use attest_store::StoreError;
use attest_types::{ParamsError, ValidatorId, WorkUnitId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("validator {validator} already voted on {work_unit}")]
    DuplicateVote {
        validator: ValidatorId,
        work_unit: WorkUnitId,
    },

    #[error("unknown work unit {0}")]
    UnknownWorkUnit(WorkUnitId),

    #[error("work unit {0} is already registered")]
    DuplicateWorkUnit(WorkUnitId),

    #[error("declared value {0} must be finite and non-negative")]
    InvalidDeclaredValue(f64),

    #[error("vote commits {committed} stake but validator holds {available}")]
    StakeExceedsBalance { committed: u64, available: u64 },

    #[error("vote must commit a non-zero stake")]
    ZeroStake,

    #[error("work unit {0} is already resolved")]
    AlreadyResolved(WorkUnitId),

    #[error("invalid consensus parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
