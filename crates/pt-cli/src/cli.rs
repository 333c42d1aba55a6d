//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Presence tracker.
///
/// Polls a presence service for one identity, logs every reading, and
/// reports the online sessions seen over the tracking window.
#[derive(Debug, Parser)]
#[command(name = "pt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track an identity's presence until the window ends or Ctrl+C.
    Track(TrackArgs),

    /// Rebuild the report from a persisted snapshot log.
    Report(ReportArgs),

    /// Show configured paths and the latest recorded reading.
    Status,
}

/// Arguments for `pt track`.
///
/// Without `--phone` or `--user-id` the identifier is prompted for.
#[derive(Debug, Default, Args)]
pub struct TrackArgs {
    /// Phone number of the identity, with country code.
    #[arg(long, conflicts_with = "user_id")]
    pub phone: Option<String>,

    /// Numeric user ID of the identity.
    #[arg(long)]
    pub user_id: Option<String>,

    /// Tracking window in hours (overrides config).
    #[arg(long)]
    pub window_hours: Option<u64>,

    /// Seconds to wait between polls (overrides config).
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Continue an existing snapshot log instead of starting a new one.
    #[arg(long)]
    pub resume: bool,
}

/// Arguments for `pt report`.
#[derive(Debug, Default, Args)]
pub struct ReportArgs {
    /// Snapshot log to read (defaults to the configured path).
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Tracking window in hours used for the percentage (overrides config).
    #[arg(long)]
    pub window_hours: Option<u64>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}
