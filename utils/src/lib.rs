//! Shared utilities for the attest validation ledger.

pub mod logging;

pub use logging::{init_logging, LogFormat};
