//! CSV exports: measured series (one row per point) and bare frame steps.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::DataSeries;
use crate::error::AppError;
use crate::timeframe::TimeRange;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Serialize)]
struct PointRow<'a> {
    series_id: &'a str,
    query_id: &'a str,
    metric_id: &'a str,
    label: &'a str,
    ghost: String,
    index: usize,
    anchor: String,
    inc_begin: String,
    exc_end: String,
    value: Option<f64>,
}

#[derive(Debug, Serialize)]
struct StepRow {
    index: usize,
    anchor: String,
    inc_begin: String,
    exc_end: String,
    duration_secs: i64,
}

fn fmt_time(t: Option<chrono::NaiveDateTime>) -> String {
    t.map(|t| t.format(TIME_FORMAT).to_string()).unwrap_or_default()
}

/// Write every point of every series to a CSV file.
pub fn write_series_csv(path: &Path, series: &[DataSeries]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(3, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_series_csv_to(file, series)
}

/// Write every point of every series as CSV to any writer.
pub fn write_series_csv_to<W: Write>(writer: W, series: &[DataSeries]) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    for s in series {
        let ghost = s.ghost.map(|g| g.to_string()).unwrap_or_default();
        for (index, point) in s.iter_points().enumerate() {
            out.serialize(PointRow {
                series_id: &s.id,
                query_id: &s.query_id,
                metric_id: &s.metric_id,
                label: &s.label,
                ghost: ghost.clone(),
                index,
                anchor: fmt_time(point.range.anchor()),
                inc_begin: fmt_time(point.range.inc_begin()),
                exc_end: fmt_time(point.range.exc_end()),
                value: point.value,
            })
            .map_err(|e| AppError::new(3, format!("Failed to write export CSV row: {e}")))?;
        }
    }
    out.flush()
        .map_err(|e| AppError::new(3, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write frame steps as CSV to any writer.
pub fn write_steps_csv_to<W: Write>(writer: W, steps: &[TimeRange]) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    for (index, step) in steps.iter().enumerate() {
        out.serialize(StepRow {
            index,
            anchor: fmt_time(step.anchor()),
            inc_begin: fmt_time(step.inc_begin()),
            exc_end: fmt_time(step.exc_end()),
            duration_secs: step.duration().num_seconds(),
        })
        .map_err(|e| AppError::new(3, format!("Failed to write steps CSV row: {e}")))?;
    }
    out.flush()
        .map_err(|e| AppError::new(3, format!("Failed to flush steps CSV: {e}")))?;
    Ok(())
}
