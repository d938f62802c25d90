//! Command-line parsing for the metrics time frame tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the stepping code.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};

use crate::domain::{LogLevel, OutputFormat};
use crate::error::FrameError;
use crate::timeframe::{Ghost, Mode, TimeUnit};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "axm", version, about = "Time frame stepping for metrics queries")]
pub struct Cli {
    /// Log verbosity (RUST_LOG overrides).
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the period and measurement steps of a single time frame.
    Steps(StepsArgs),
    /// Run every query of a YAML query file against the random source.
    Run(RunArgs),
}

/// Time frame given as flags.
#[derive(Debug, Args, Clone)]
pub struct StepsArgs {
    /// Unit of the overall period.
    #[arg(long, value_enum, default_value_t = TimeUnit::Month)]
    pub range_unit: TimeUnit,

    /// Number of range units in the period.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub range_val: i64,

    /// Width of each step.
    #[arg(long, value_enum, default_value_t = TimeUnit::Day)]
    pub gran_unit: TimeUnit,

    /// Unit of the smoothing window.
    #[arg(long, value_enum, default_value_t = TimeUnit::Day)]
    pub smooth_unit: TimeUnit,

    /// Smoothing window in smooth units (0 disables smoothing).
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub smooth_val: i64,

    #[arg(long, value_enum, default_value_t = Mode::Current)]
    pub mode: Mode,

    /// Use this instant instead of now (`YYYY-MM-DD[ HH:MM[:SS[.ffffff]]]`).
    #[arg(long, value_parser = parse_reframe)]
    pub reframe: Option<NaiveDateTime>,

    /// Begin every step at the period start.
    #[arg(long)]
    pub accumulate: bool,

    /// Clip smoothed step begins to the period start.
    #[arg(long)]
    pub no_overflow_begin: bool,

    /// Let the last step extend past the period end.
    #[arg(long)]
    pub overflow_end: bool,

    /// Shift the frame into the past (PREV_PERIOD1, PREV_PERIOD2, PREV_YEAR1, PREV_YEAR2).
    #[arg(long, value_parser = parse_ghost)]
    pub ghost: Option<Ghost>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Options for running a query file.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// YAML query file.
    #[arg(long, value_name = "YAML")]
    pub queries: PathBuf,

    /// Use this instant instead of now for every query.
    #[arg(long, value_parser = parse_reframe)]
    pub reframe: Option<NaiveDateTime>,

    /// Seed for the random source.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Export every point to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Export every series to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

fn parse_reframe(value: &str) -> Result<NaiveDateTime, FrameError> {
    crate::io::parse_datetime("reframe", value)
}

fn parse_ghost(value: &str) -> Result<Ghost, FrameError> {
    value.to_ascii_uppercase().replace('-', "_").parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_steps_flags() {
        let cli = Cli::try_parse_from([
            "axm",
            "steps",
            "--range-unit",
            "quarter",
            "--gran-unit",
            "week",
            "--smooth-val",
            "14",
            "--mode",
            "lastwhole",
            "--reframe",
            "2014-02-14 16:30:45",
            "--ghost",
            "prev_year1",
            "--no-overflow-begin",
            "--format",
            "csv",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Warn);
        let Command::Steps(args) = cli.command else {
            panic!("expected steps");
        };
        assert_eq!(args.range_unit, TimeUnit::Quarter);
        assert_eq!(args.gran_unit, TimeUnit::Week);
        assert_eq!(args.smooth_val, 14);
        assert_eq!(args.mode, Mode::LastWhole);
        assert_eq!(args.ghost, Some(Ghost::PrevYear1));
        assert!(args.no_overflow_begin);
        assert!(!args.overflow_end);
        assert_eq!(args.format, OutputFormat::Csv);
        assert!(args.reframe.is_some());
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "axm",
            "--log-level",
            "debug",
            "run",
            "--queries",
            "q.yaml",
            "--seed",
            "7",
            "--export-json",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.queries, PathBuf::from("q.yaml"));
        assert_eq!(args.seed, 7);
        assert_eq!(args.export_json, Some(PathBuf::from("out.json")));
        assert!(args.export_csv.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Cli::try_parse_from(["axm", "steps", "--ghost", "PREV_DECADE"]).is_err());
        assert!(Cli::try_parse_from(["axm", "steps", "--reframe", "yesterday"]).is_err());
        assert!(Cli::try_parse_from(["axm", "steps", "--range-unit", "fortnight"]).is_err());
    }
}
