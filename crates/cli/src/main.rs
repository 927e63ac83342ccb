//! Nodeflow CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: runtime settings from flags and environment
//!    variables (see [`args::RuntimeArgs`]).
//! 2. **Wire observability**: JSON `tracing` output on stderr plus an optional
//!    OTLP exporter (see [`telemetry`]).
//! 3. **Construct nodes**: build the [`nodes::NodeRegistry`] with every
//!    built-in node.
//! 4. **Dispatch**: `run` executes one node and prints its
//!    [`pipeline::ExecutionReport`] on stdout; `list` prints the registered
//!    node types.
//!
//! Exit status is 0 when the node returned a result (including a degraded
//! failure payload) and 1 when execution produced a `NodeError`.

mod args;
mod telemetry;

use std::io::Read as _;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, Context as _};
use clap::Parser;
use nodes::NodeRegistry;
use pipeline::{NodeConfig, NodeType};

use crate::args::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let telemetry = telemetry::init(&cli.runtime.log_level)?;

    let outcome = dispatch(cli).await;

    telemetry.shutdown();
    outcome
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let retry = cli.runtime.retry_config()?;
    let registry = NodeRegistry::with_defaults(cli.runtime.http_config(), retry)?;

    match cli.command {
        Command::List => {
            for node_type in registry.node_types() {
                println!("{node_type}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run { node_type, config } => {
            let node_type =
                NodeType::new(node_type).ok_or_else(|| anyhow!("node type must not be empty"))?;
            let config = read_config(&config)?;

            match registry.execute_with_report(&node_type, config).await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    tracing::error!(node_type = %node_type, error = %err, "Node execution failed");
                    eprintln!("error: {err}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn read_config(path: &Path) -> anyhow::Result<NodeConfig> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read node configuration from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read node configuration from {}", path.display()))?
    };

    let value: serde_json::Value =
        serde_json::from_str(&raw).context("node configuration is not valid JSON")?;
    NodeConfig::from_value(value)
        .ok_or_else(|| anyhow!("node configuration must be a JSON object"))
}
