//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Twenty-word card legality.
///
/// Keeps a checksum-verified local copy of the MTGJSON card snapshot and
/// classifies every card's rules text against the twenty-word limit.
#[derive(Parser, Debug)]
#[command(name = "twmtg")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Cache directory for the snapshot (overrides the config file)
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sync the snapshot and classify every card
    Populate,

    /// Print a legality count (legal cards by default)
    Count(CountArgs),

    /// Look up a card by name (SQL LIKE pattern, e.g. "Serra%")
    Card(CardArgs),

    /// Show snapshot date/version and the ruleset version
    Meta,

    /// Print the resolved configuration
    Config,
}

/// Which aggregate `count` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountMetric {
    Legal,
    Illegal,
    Total,
    IllegalPercentage,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
#[group(multiple = false)]
pub struct CountArgs {
    /// Number of legal cards
    #[arg(long)]
    pub legal: bool,

    /// Number of illegal cards
    #[arg(long)]
    pub illegal: bool,

    /// Number of classified cards
    #[arg(long)]
    pub total: bool,

    /// Share of classified cards that are illegal
    #[arg(long = "illegal-pct")]
    pub illegal_pct: bool,
}

impl CountArgs {
    #[must_use]
    pub fn metric(&self) -> CountMetric {
        if self.illegal_pct {
            CountMetric::IllegalPercentage
        } else if self.total {
            CountMetric::Total
        } else if self.illegal {
            CountMetric::Illegal
        } else {
            CountMetric::Legal
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CardArgs {
    /// Card name or SQL LIKE pattern
    pub name: String,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}
