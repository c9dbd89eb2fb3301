//! CLI argument definitions for the cohort unenroller.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use cohort_ingest::Delimiter;

#[derive(Parser)]
#[command(
    name = "cohort-unenroller",
    version,
    about = "Remove users from cohorts by CSV mapping",
    long_about = "Remove users from cohorts based on a CSV of username + cohort pairs.\n\n\
                  The input CSV must carry a 'username' column plus 'cohortid' or\n\
                  'cohortidnumber'. Memberships are resolved against a directory\n\
                  snapshot folder (users.csv, cohorts.csv, members.csv)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process a mapping CSV and remove matched memberships.
    Run(RunArgs),

    /// Export a saved run's result CSV.
    Export(ExportArgs),

    /// List the cohorts in a directory snapshot.
    Cohorts(CohortsArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the CSV input file (username + cohort id or idnumber).
    #[arg(long = "csv", value_name = "PATH")]
    pub csv: PathBuf,

    /// Path to the directory snapshot folder.
    #[arg(long = "directory", value_name = "DIR")]
    pub directory: PathBuf,

    /// Write a result CSV (status per row).
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Validate only; do not change the directory snapshot.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Trim + lowercase usernames before lookup.
    #[arg(long = "username-standardise")]
    pub standardise: bool,

    /// CSV delimiter.
    #[arg(long = "delimiter", value_enum, default_value = "comma")]
    pub delimiter: DelimiterArg,

    /// Save the outcome under a run id in this folder for later export.
    #[arg(long = "save-run", value_name = "DIR")]
    pub save_run: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ExportArgs {
    /// Folder holding saved runs.
    #[arg(long = "runs", value_name = "DIR")]
    pub runs: PathBuf,

    /// Id of the saved run to export.
    #[arg(long = "run-id", value_name = "ID")]
    pub run_id: String,

    /// Path of the result CSV to write.
    #[arg(long = "report", value_name = "PATH")]
    pub report: PathBuf,
}

#[derive(Parser)]
pub struct CohortsArgs {
    /// Path to the directory snapshot folder.
    #[arg(value_name = "DIR")]
    pub directory: PathBuf,
}

/// CSV delimiter choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum DelimiterArg {
    Comma,
    Semicolon,
    Tab,
}

impl From<DelimiterArg> for Delimiter {
    fn from(value: DelimiterArg) -> Self {
        match value {
            DelimiterArg::Comma => Delimiter::Comma,
            DelimiterArg::Semicolon => Delimiter::Semicolon,
            DelimiterArg::Tab => Delimiter::Tab,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
