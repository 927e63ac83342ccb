//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use nodes::HttpClientConfig;
use pipeline::{Backoff, MaxAttempts, NodeError, RetryConfig};

/// Upper bound for a single exponential back-off delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Run single pipeline nodes from the command line.
#[derive(Debug, Parser)]
#[command(name = "nodeflow", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute one node and print its execution report as JSON.
    Run {
        /// Type tag of the node to execute.
        #[arg(long = "node-type", default_value = "api")]
        node_type: String,

        /// Path to a JSON file with the node configuration, or `-` for stdin.
        #[arg(long)]
        config: PathBuf,
    },

    /// List the registered node types.
    List,
}

/// Runtime settings shared by every node execution.
#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    /// Maximum attempts per execution, including the first.
    #[arg(
        long = "max-attempts",
        env = "NODEFLOW_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,

    /// Initial back-off between attempts in milliseconds (doubles per failure).
    /// Zero retries immediately.
    #[arg(long = "backoff-ms", env = "NODEFLOW_BACKOFF_MS", default_value_t = 200)]
    pub backoff_ms: u64,

    /// Per-attempt timeout in milliseconds.
    #[arg(long = "attempt-timeout-ms", env = "NODEFLOW_ATTEMPT_TIMEOUT_MS")]
    pub attempt_timeout_ms: Option<u64>,

    /// HTTP request timeout in seconds.
    #[arg(
        long = "http-timeout",
        env = "HTTP_TIMEOUT",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub http_timeout: u64,

    /// User-Agent header sent by the HTTP node.
    #[arg(long = "http-user-agent", env = "HTTP_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long = "log-level", default_value = "info")]
    pub log_level: String,
}

impl RuntimeArgs {
    /// Builds the retry settings applied to every node.
    pub fn retry_config(&self) -> Result<RetryConfig, NodeError> {
        let max_attempts =
            MaxAttempts::new(self.max_attempts).ok_or_else(|| NodeError::Configuration {
                message: "max attempts must be at least 1".to_owned(),
            })?;

        let backoff = if self.backoff_ms == 0 {
            Backoff::None
        } else {
            let initial = Duration::from_millis(self.backoff_ms);
            Backoff::Exponential {
                initial,
                factor: 2,
                max: MAX_BACKOFF.max(initial),
            }
        };

        let mut config = RetryConfig::default()
            .with_max_attempts(max_attempts)
            .with_backoff(backoff);
        if let Some(ms) = self.attempt_timeout_ms {
            config = config.with_attempt_timeout(Duration::from_millis(ms));
        }
        Ok(config)
    }

    /// Builds the HTTP client settings.
    pub fn http_config(&self) -> HttpClientConfig {
        let config =
            HttpClientConfig::default().with_timeout(Duration::from_secs(self.http_timeout));
        match &self.user_agent {
            Some(agent) => config.with_user_agent(agent.as_str()),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("nodeflow").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn run_defaults_to_the_http_node() {
        let cli = parse(&["run", "--config", "request.json"]);
        match cli.command {
            Command::Run { node_type, config } => {
                assert_eq!(node_type, "api");
                assert_eq!(config, PathBuf::from("request.json"));
            }
            Command::List => panic!("parsed the wrong subcommand"),
        }
    }

    #[test]
    fn default_retry_settings_match_the_library_defaults() {
        let cli = parse(&["list"]);
        assert_eq!(cli.runtime.retry_config().unwrap(), RetryConfig::default());
        assert_eq!(cli.runtime.http_config(), HttpClientConfig::default());
    }

    #[test]
    fn retry_flags_shape_the_policy() {
        let cli = parse(&[
            "--max-attempts",
            "5",
            "--backoff-ms",
            "0",
            "--attempt-timeout-ms",
            "1500",
            "list",
        ]);
        let retry = cli.runtime.retry_config().unwrap();
        assert_eq!(retry.max_attempts.get(), 5);
        assert_eq!(retry.backoff, Backoff::None);
        assert_eq!(retry.attempt_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn http_flags_shape_the_client() {
        let cli = parse(&["--http-timeout", "3", "--http-user-agent", "batch/2", "list"]);
        let http = cli.runtime.http_config();
        assert_eq!(http.timeout, Duration::from_secs(3));
        assert_eq!(http.user_agent, "batch/2");
        assert!(Cli::try_parse_from(["nodeflow", "--http-timeout", "0", "list"]).is_err());
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let parsed = Cli::try_parse_from(["nodeflow", "--max-attempts", "0", "list"]);
        assert!(parsed.is_err());
    }
}
