//! Tally command line front end.
//!
//! Wires configuration, logging and the calculator together for the `tally`
//! binary.

pub mod cli;
pub mod config;
pub mod tracing_setup;

pub use cli::{Cli, Command, OutputFormat, execute, run};
pub use config::{ConfigSource, TallyConfig};
pub use tracing_setup::{TracingConfig, init_tracing};
