//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initialises logging
//! - steps a single frame, or runs a query file through the pipeline
//! - prints reports and writes optional exports

use std::io::Write;

use chrono::Local;
use clap::Parser;

use crate::cli::{Command, RunArgs, StepsArgs};
use crate::domain::{LogLevel, OutputFormat, RunConfig, SeriesFile, StepsReport};
use crate::error::AppError;
use crate::timeframe::{FrameSpec, Stepper, TimeRange};

pub mod pipeline;

const LOG_TARGET: &str = "      app";

/// Entry point for the `axm` binary.
pub fn run() -> Result<(), AppError> {
    // Optional; a missing file is not an error.
    let _ = dotenvy::dotenv();

    let cli = crate::cli::Cli::parse();
    init_logging(cli.log_level);

    match cli.command {
        Command::Steps(args) => handle_steps(&args),
        Command::Run(args) => handle_run(&args),
    }
}

/// Initialise `env_logger`; `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: LogLevel) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level.as_filter());
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(true)
        .try_init();
}

fn handle_steps(args: &StepsArgs) -> Result<(), AppError> {
    let spec = frame_spec_from_args(args)?;
    let stepper = Stepper::new(spec, args.ghost);
    let now = Local::now().naive_local();

    let analysis = stepper.analyze_at(now)?;
    let steps: Vec<TimeRange> = stepper.steps_at(now)?.collect();
    log::info!(target: LOG_TARGET, "{stepper} produced {} steps", steps.len());

    match args.format {
        OutputFormat::Table => {
            print!("{}", crate::report::format_steps(&stepper, &analysis, &steps));
        }
        OutputFormat::Csv => {
            crate::io::write_steps_csv_to(std::io::stdout().lock(), &steps)?;
        }
        OutputFormat::Json => {
            let report = StepsReport {
                frame: spec.pinned(now),
                ghost: args.ghost,
                range: analysis.range(),
                steps,
            };
            println!("{}", crate::io::to_json_string(&report)?);
        }
    }
    flush_stdout()
}

fn handle_run(args: &RunArgs) -> Result<(), AppError> {
    let config = run_config_from_args(args);
    let output = pipeline::run_queries(&config)?;

    match config.format {
        OutputFormat::Table => {
            print!(
                "{}",
                crate::report::format_run_summary(&output.entries, output.generated_at)
            );
        }
        OutputFormat::Csv => {
            let series: Vec<_> = output.entries.iter().map(|e| e.series.clone()).collect();
            crate::io::write_series_csv_to(std::io::stdout().lock(), &series)?;
        }
        OutputFormat::Json => {
            println!("{}", crate::io::to_json_string(&series_file(&output))?);
        }
    }

    // Optional exports.
    if let Some(path) = &config.export_csv {
        let series: Vec<_> = output.entries.iter().map(|e| e.series.clone()).collect();
        crate::io::write_series_csv(path, &series)?;
        log::info!(target: LOG_TARGET, "Wrote CSV export '{}'", path.display());
    }
    if let Some(path) = &config.export_json {
        crate::io::write_series_json(path, &series_file(&output))?;
        log::info!(target: LOG_TARGET, "Wrote JSON export '{}'", path.display());
    }

    flush_stdout()
}

/// Build a frame from `axm steps` flags.
pub fn frame_spec_from_args(args: &StepsArgs) -> Result<FrameSpec, AppError> {
    let spec = FrameSpec::builder()
        .range_unit(args.range_unit)
        .range_val(args.range_val)
        .gran_unit(args.gran_unit)
        .smooth_unit(args.smooth_unit)
        .smooth_val(args.smooth_val)
        .mode(args.mode)
        .reframe_dt(args.reframe)
        .accumulate(args.accumulate)
        .allow_overflow_begin(!args.no_overflow_begin)
        .allow_overflow_end(args.overflow_end)
        .build()?;
    Ok(spec)
}

pub fn run_config_from_args(args: &RunArgs) -> RunConfig {
    RunConfig {
        queries_path: args.queries.clone(),
        reframe: args.reframe,
        seed: args.seed,
        format: args.format,
        export_csv: args.export_csv.clone(),
        export_json: args.export_json.clone(),
    }
}

/// Export schema for a finished run.
pub fn series_file(output: &pipeline::RunOutput) -> SeriesFile {
    SeriesFile {
        tool: "axm".to_string(),
        generated_at: output.generated_at,
        metrics: output.metrics.clone(),
        series: output.entries.clone(),
    }
}

fn flush_stdout() -> Result<(), AppError> {
    std::io::stdout()
        .flush()
        .map_err(|e| AppError::new(3, format!("Failed to write output: {e}")))
}
