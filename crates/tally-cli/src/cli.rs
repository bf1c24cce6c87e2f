//! Command line interface
//!
//! Each command renders its output to a `String`; `run` writes it out. Keeping
//! I/O at the edge lets the commands be exercised directly in tests.

use crate::config::TallyConfig;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io::{Read, Write};
use std::process::ExitCode;
use std::path::PathBuf;
use tally_calculator::{
    Allocation, AllocationRequest, BillLine, ManufacturingSplit, ManufacturingSplitInput,
};
use tally_types::{Cents, SplitKey, TallyError, TallyResult, Weight};
use tracing::{debug, error, info};

/// Exact proportional cent allocation
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(about = "Split cent totals by weight without losing a cent")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to $TALLY_CONFIG_PATH, then tally.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Allocate a total across weighted keys
    Allocate {
        /// Total in cents
        #[arg(short, long, allow_negative_numbers = true)]
        total: i64,

        /// `key=weight`, repeatable; order decides tie-breaks
        #[arg(short, long = "weight", value_parser = parse_weight_arg, required = true)]
        weights: Vec<WeightArg>,
    },

    /// Split a manufacturing run over its components (JSON document)
    Split {
        /// Input file; reads stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

/// A `key=weight` argument. The weight is validated later so that bad weights
/// surface as invalid input rather than as a usage error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightArg {
    pub key: String,
    pub weight: String,
}

fn parse_weight_arg(raw: &str) -> Result<WeightArg, String> {
    let (key, weight) =
        raw.rsplit_once('=').ok_or_else(|| format!("expected key=weight, got '{raw}'"))?;
    Ok(WeightArg { key: key.to_string(), weight: weight.trim().to_string() })
}

impl WeightArg {
    fn validate(&self) -> TallyResult<(SplitKey, Weight)> {
        let key = SplitKey::new(&self.key)?;
        let invalid = || {
            TallyError::invalid_key(
                key.as_str(),
                format!("weight for '{key}' must be a positive integer, got '{}'", self.weight),
            )
        };
        let value: serde_json::Value = serde_json::from_str(&self.weight).map_err(|_| invalid())?;
        let weight = Weight::from_json(&value).map_err(|_| invalid())?;
        Ok((key, weight))
    }
}

#[derive(Serialize)]
struct SplitReport<'a> {
    total_cents: Cents,
    memo: Option<&'a str>,
    lines: &'a [BillLine],
}

/// Run `cli.command`, reading from `stdin` when the command needs it
pub fn execute(cli: &Cli, config: &TallyConfig, stdin: impl Read) -> anyhow::Result<String> {
    match &cli.command {
        Command::Allocate { total, weights } => {
            let allocation = allocate_command(*total, weights, config)?;
            render_allocation(&allocation, cli.format)
        }
        Command::Split { input } => {
            let document = match input {
                Some(path) => fs::read_to_string(path).map_err(TallyError::from)?,
                None => read_all(stdin)?,
            };
            render_split(&document, config, cli.format)
        }
        Command::Config => Ok(config.to_toml()?),
    }
}

/// Run `cli.command` and write its output to `stdout`.
///
/// A failure is logged once with its category and turned into a failing exit
/// code; it is not returned to the caller.
pub fn run(cli: &Cli, config: &TallyConfig, stdin: impl Read, mut stdout: impl Write) -> ExitCode {
    let result = execute(cli, config, stdin)
        .and_then(|output| writeln!(stdout, "{output}").map_err(anyhow::Error::from));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let category = err.downcast_ref::<TallyError>().map_or("internal", TallyError::category);
            error!(category, error = %err, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn read_all(mut stdin: impl Read) -> TallyResult<String> {
    let mut document = String::new();
    stdin.read_to_string(&mut document)?;
    Ok(document)
}

fn allocate_command(total: i64, weights: &[WeightArg], config: &TallyConfig) -> TallyResult<Allocation> {
    if weights.len() > config.limits.max_weights {
        return Err(TallyError::invalid_field(
            "weights",
            format!("at most {} weights are allowed, got {}", config.limits.max_weights, weights.len()),
        ));
    }

    let entries = weights.iter().map(WeightArg::validate).collect::<TallyResult<Vec<_>>>()?;
    let request = AllocationRequest::from_weights(total, entries)?;
    debug!(total, entries = request.entries().len(), "Running allocation");
    Ok(request.allocate())
}

fn render_allocation(allocation: &Allocation, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(allocation)?),
        OutputFormat::Text => {
            let width = allocation
                .lines()
                .iter()
                .map(|l| l.key.as_str().chars().count())
                .chain(std::iter::once("total".len()))
                .max()
                .unwrap_or(0);
            let mut out = String::new();
            for line in allocation.lines() {
                let marker = if line.remainder_cent { " +1" } else { "" };
                writeln!(out, "{:<width$}  {:>12}{marker}", line.key.as_str(), line.cents.get())?;
            }
            write!(out, "{:<width$}  {:>12}", "total", allocation.total().get())?;
            Ok(out)
        }
    }
}

fn render_split(document: &str, config: &TallyConfig, format: OutputFormat) -> anyhow::Result<String> {
    let input: ManufacturingSplitInput = serde_json::from_str(document).map_err(TallyError::from)?;
    let split = ManufacturingSplit::parse(&input, &config.split_limits())?;
    let lines = split.allocate(&config.description_format());
    info!(total = split.total().get(), lines = lines.len(), "Manufacturing split allocated");

    match format {
        OutputFormat::Json => {
            let report = SplitReport { total_cents: split.total(), memo: split.memo(), lines: &lines };
            Ok(serde_json::to_string_pretty(&report)?)
        }
        OutputFormat::Text => {
            let rendered: Vec<&str> = lines.iter().map(|line| line.description.as_str()).collect();
            Ok(rendered.join("\n"))
        }
    }
}
