//! CLI entry point for twmtg.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use twmtg_core::config::load_default_file_config;
use twmtg_core::{Pipeline, Settings};

mod cli;
mod commands;
mod progress;

use cli::{Cli, Command};

/// Process outcome mapped to the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    /// A lookup matched nothing.
    NotFound,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NotFound => 1,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();
    init_tracing(default_log_level(cli.verbose, cli.quiet));
    debug!(?cli, "CLI arguments parsed");

    let loaded = load_default_file_config().context("failed to load configuration")?;
    let settings = Settings::resolve(loaded.config.as_ref(), cli.cache_dir.clone());

    let exit = match &cli.command {
        Command::Config => commands::run_config(&settings, &loaded),
        Command::Populate => {
            commands::run_populate(&build_pipeline(&settings)?, cli.quiet, cli.no_progress).await?
        }
        Command::Count(args) => commands::run_count(&build_pipeline(&settings)?, args).await?,
        Command::Card(args) => commands::run_card(&build_pipeline(&settings)?, args).await?,
        Command::Meta => commands::run_meta(&build_pipeline(&settings)?).await?,
    };
    Ok(exit.into())
}

fn build_pipeline(settings: &Settings) -> Result<Pipeline> {
    Pipeline::new(settings).context("invalid configuration")
}

/// Priority: `RUST_LOG` env var > quiet flag > verbose flag > default (info).
fn default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}
