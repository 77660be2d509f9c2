//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// hitlab - Which audio features separate chart hits from the rest?
///
/// Cleans a chart-week / audio-feature table into one row per song, labels
/// songs that reached the top 10, and cross-validates a logistic baseline
/// against a random forest. Writes tables and a JSON report for plotting.
#[derive(Parser, Debug)]
#[command(name = "hitlab")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Input CSV (one row per song per chart week)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output directory for tables and report.json
    #[arg(short, long, value_name = "DIR", default_value = "hitlab-output")]
    pub output: PathBuf,

    /// Number of cross-validation folds
    #[arg(long, value_name = "K", default_value = "10")]
    pub folds: usize,

    /// Seed for fold assignment, bootstrap sampling and permutation
    #[arg(long, value_name = "N", default_value = "42")]
    pub seed: u64,

    /// Forest sizes to try (comma separated)
    #[arg(long, value_name = "LIST", value_delimiter = ',', default_value = "50,150")]
    pub trees: Vec<usize>,

    /// Features sampled per split to try (comma separated)
    #[arg(long, value_name = "LIST", value_delimiter = ',', default_value = "2,3,4")]
    pub mtry: Vec<usize>,

    /// Number of worker threads (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only, no progress bar)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Load, clean and scale only; print dataset diagnostics without fitting
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
