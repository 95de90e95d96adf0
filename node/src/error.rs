use attest_consensus::ConsensusError;
use attest_ledger::LedgerError;
use attest_registry::RegistryError;
use attest_store::StoreError;
use attest_types::ParamsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The vote counted, but its ledger entries are held for a later append.
    #[error("vote accepted but {pending} ledger entries await recording: {source}")]
    Unrecorded {
        pending: usize,
        #[source]
        source: LedgerError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid consensus parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline task failed: {0}")]
    Task(String),
}
