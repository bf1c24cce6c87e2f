//! Structured logging setup
//!
//! Logs go to stderr so that stdout carries only command output.

use crate::config::LoggingConfig;
use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

const VERBOSE_FILTER: &str = "tally_cli=debug,tally_calculator=debug";

/// Configuration for the tracing subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl TracingConfig {
    pub fn from_config(logging: &LoggingConfig, verbose: bool) -> Self {
        let filter = if verbose { VERBOSE_FILTER.to_string() } else { logging.filter.clone() };
        Self { filter, json: logging.json }
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured filter.
pub fn init_tracing(config: &TracingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = if config.json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}
