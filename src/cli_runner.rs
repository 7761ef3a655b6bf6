//! Binary-side glue: argument parsing, logging setup and the sweep itself.

use std::io;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{self, SweepConfig};
use crate::pipeline;

/// Environment variable that overrides the log filter.
pub const LOG_ENV: &str = "PERMSWEEP_LOG";

/// Public entry for running the CLI.
pub fn run_cli_app() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::run()?;
    setup_logging(args.verbose);

    let config = SweepConfig::from_args(&args)?;
    info!(
        "sweeping {} with {} workers, archive {}",
        config.root.display(),
        config.concurrency,
        config.output.display()
    );

    pipeline::run_sweep(&config, io::stdout())?;
    Ok(())
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("permsweep=debug,warn")
        } else {
            EnvFilter::new("permsweep=info,warn")
        }
    });

    // Logs go to stderr; stdout carries only the report lines.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
