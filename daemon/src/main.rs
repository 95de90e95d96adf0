//! attest daemon: entry point for running scenarios and auditing ledgers.

mod scenario;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use attest_ledger::LedgerSnapshot;
use attest_node::{audit_snapshot, NodeConfig, ValidationNode};
use attest_types::SystemClock;
use attest_utils::{init_logging, LogFormat};
use clap::Parser;

use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "attest-daemon", about = "Validation consensus and ledger daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "ATTEST_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "ATTEST_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "ATTEST_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Replay a JSON scenario on an in-memory node and print the result.
    Simulate {
        #[arg(long)]
        scenario: PathBuf,

        /// Write the resulting ledger as a snapshot file.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Verify an exported ledger snapshot.
    Audit {
        #[arg(long)]
        ledger: PathBuf,
    },
    /// Print the default configuration as TOML.
    DefaultConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Command::DefaultConfig = cli.command {
        print!("{}", NodeConfig::default().to_toml_string()?);
        return Ok(());
    }

    init_logging(config.log_format, &config.log_level);

    match cli.command {
        Command::Simulate { scenario, export } => {
            let scenario = Scenario::from_json_file(&scenario)?;
            let node = ValidationNode::new(config)?;
            let summary = scenario::run(&node, &scenario).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);

            if let Some(path) = export {
                let snapshot = node.export_snapshot()?;
                std::fs::write(&path, snapshot.to_bytes()?)
                    .with_context(|| format!("writing snapshot {}", path.display()))?;
                tracing::info!(
                    entries = snapshot.entry_count(),
                    path = %path.display(),
                    "ledger snapshot exported"
                );
            }
        }
        Command::Audit { ledger } => {
            let bytes = std::fs::read(&ledger)
                .with_context(|| format!("reading snapshot {}", ledger.display()))?;
            let snapshot = LedgerSnapshot::from_bytes(&bytes)?;
            let audit = audit_snapshot(&snapshot, Arc::new(SystemClock));
            println!("{}", serde_json::to_string_pretty(&audit)?);
            if !audit.is_valid() {
                anyhow::bail!(
                    "ledger failed audit: digest {}, {} broken links, {} tampered entries",
                    if audit.digest_matches { "ok" } else { "mismatch" },
                    audit.report.broken_links.len(),
                    audit.report.tampered.len()
                );
            }
        }
        Command::DefaultConfig => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "log_level = \"debug\"\n[consensus]\nquorum = 5\nvote_cap = 9\n").unwrap();

        let cli = Cli::parse_from([
            "attest-daemon",
            "--config",
            path.to_str().unwrap(),
            "--log-format",
            "json",
            "default-config",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.consensus.quorum, 5);
    }

    #[test]
    fn invalid_config_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "[consensus]\nquorum = 5\nvote_cap = 2\n").unwrap();
        let cli = Cli::parse_from(["attest-daemon", "--config", path.to_str().unwrap(), "default-config"]);
        assert!(load_config(&cli).is_err());
    }
}
