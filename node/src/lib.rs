//! Validation node: composes the registry, consensus engine and ledger.
//!
//! - `node`: the [`ValidationNode`] and its vote pipeline
//! - `config`: TOML configuration
//! - `metrics`: Prometheus metrics
//! - `event`: synchronous event bus for dashboards and audit hooks
//! - `recorder`: ordered ledger appends with a retry backlog
//! - `unit_serializer`: per-work-unit pipeline serialization

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod node;
pub mod recorder;
pub mod unit_serializer;

pub use config::NodeConfig;
pub use error::NodeError;
pub use event::{EventBus, NodeEvent};
pub use metrics::NodeMetrics;
pub use node::{audit_snapshot, NodeStores, ValidationNode, VoteOutcome};
pub use recorder::{LedgerRecorder, Unrecorded};
pub use unit_serializer::UnitSerializer;
