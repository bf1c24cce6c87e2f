use clap::Parser;
use std::process::ExitCode;
use tally_cli::{Cli, TallyConfig, TracingConfig, init_tracing, run};
use tracing::info;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let (config, source) = TallyConfig::load(cli.config.as_deref())?;
    init_tracing(&TracingConfig::from_config(&config.logging, cli.verbose))?;
    source.log(&config);

    info!(version = env!("CARGO_PKG_VERSION"), command = ?cli.command, "Starting tally");

    Ok(run(&cli, &config, std::io::stdin().lock(), std::io::stdout().lock()))
}
