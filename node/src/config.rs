//! Node configuration with TOML file support.

use std::path::Path;

use attest_types::ConsensusParams;
use attest_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::NodeError;

/// Configuration for a validation node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). An empty file is a valid config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Upper bound on vote pipelines running at once across all work units.
    #[serde(default = "default_max_concurrent_units")]
    pub max_concurrent_units: usize,

    #[serde(default)]
    pub consensus: ConsensusParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_units() -> usize {
    16
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.max_concurrent_units == 0 {
            return Err(NodeError::Config("max_concurrent_units must be at least 1".into()));
        }
        self.consensus.validate()?;
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: default_true(),
            max_concurrent_units: default_max_concurrent_units(),
            consensus: ConsensusParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest_types::ApprovalThreshold;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.consensus.quorum, 3);
        assert_eq!(config.consensus.approval_threshold, ApprovalThreshold::TWO_THIRDS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            log_format = "json"
            max_concurrent_units = 4

            [consensus]
            quorum = 5
            vote_cap = 9
            approval_threshold = { numerator = 3, denominator = 4 }
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.max_concurrent_units, 4);
        assert_eq!(config.consensus.quorum, 5);
        assert_eq!(config.consensus.approval_threshold.numerator, 3);
        assert_eq!(config.consensus.initial_reputation, 0.5); // default
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn invalid_params_fail_validation() {
        let config = NodeConfig::from_toml_str("[consensus]\nquorum = 0").unwrap();
        assert!(matches!(config.validate(), Err(NodeError::Params(_))));
        let config = NodeConfig::from_toml_str("max_concurrent_units = 0").unwrap();
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        let config = NodeConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/attest.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
