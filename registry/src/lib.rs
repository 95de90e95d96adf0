//! Validator registry.
//!
//! The registry is the only writer of validator state. Registration checks the
//! configured minimum stake; afterwards only consensus resolution touches a
//! validator, through [`ValidatorRegistry::adjust_reputation`] and
//! [`ValidatorRegistry::record_outcome`].

pub mod error;
pub mod registry;

pub use error::RegistryError;
pub use registry::{clamp_reputation, ValidatorRegistry};
