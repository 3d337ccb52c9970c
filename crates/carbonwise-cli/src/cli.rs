//! CLI argument definitions for carbonwise.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `best-start` | Lowest-intensity start time inside a window |
//! | `current` | Current grid intensity |
//! | `watch` | Keep the cache warm and print the current value periodically |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--location` | `CARBONWISE_LOCATION` or `de` | Country/location code |
//!
//! # Examples
//!
//! ```bash
//! carbonwise best-start --start 2024-01-01T08:00:00Z --end 2024-01-01T20:00:00Z --duration 90
//! carbonwise best-start --start 2024-01-01T00:00:00Z --end 2024-01-02T00:00:00Z --allowed-hours 8-21
//! carbonwise current --location fr --pretty
//! ```

use clap::{Args, Parser, Subcommand};

/// Carbon-aware scheduling helper.
#[derive(Debug, Parser)]
#[command(
    name = "carbonwise",
    author,
    version,
    about = "Pick low-carbon start times from grid intensity forecasts"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Location code, overrides CARBONWISE_LOCATION.
    #[arg(long, global = true)]
    pub location: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find the start time with the lowest average intensity.
    ///
    /// # Examples
    ///
    ///   carbonwise best-start --start 2024-01-01T08:00:00Z --end 2024-01-01T20:00:00Z
    ///   carbonwise best-start --start ... --end ... --duration 45 --min-gain 20
    BestStart(BestStartArgs),

    /// Report the grid's current carbon intensity.
    Current,

    /// Refresh the cache in the background and print the current value.
    Watch(WatchArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BestStartArgs {
    /// Window start, RFC 3339.
    #[arg(long)]
    pub start: String,

    /// Window end, RFC 3339.
    #[arg(long)]
    pub end: String,

    /// Runtime in minutes.
    #[arg(long)]
    pub duration: Option<i64>,

    /// Allowed local start hours, e.g. "8-21".
    #[arg(long)]
    pub allowed_hours: Option<String>,

    /// Minimum improvement over the current intensity.
    #[arg(long)]
    pub min_gain: Option<f64>,
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Seconds between printed readings.
    #[arg(long, default_value_t = 60)]
    pub every_secs: u64,

    /// Cache refresh interval in minutes, overrides CARBONWISE_REFRESH_INTERVAL_MINUTES.
    #[arg(long)]
    pub refresh_minutes: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_start_accepts_optional_filters() {
        let cli = Cli::try_parse_from([
            "carbonwise",
            "best-start",
            "--start",
            "2024-01-01T00:00:00Z",
            "--end",
            "2024-01-01T12:00:00Z",
            "--allowed-hours",
            "8-21",
            "--pretty",
        ])
        .expect("valid arguments");

        assert!(cli.pretty);
        let Command::BestStart(args) = cli.command else {
            panic!("expected best-start");
        };
        assert_eq!(args.duration, None);
        assert_eq!(args.allowed_hours.as_deref(), Some("8-21"));
    }

    #[test]
    fn best_start_requires_window_bounds() {
        assert!(Cli::try_parse_from(["carbonwise", "best-start", "--start", "x"]).is_err());
    }
}
