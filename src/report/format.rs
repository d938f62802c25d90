//! Formatted terminal output.
//!
//! We keep formatting code in one place so the stepping and pipeline code
//! stays free of presentation concerns.

use chrono::NaiveDateTime;

use crate::domain::SeriesEntry;
use crate::timeframe::{FrameAnalysis, Stepper, TimeRange, format_duration};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format the analyzed frame and its steps as a table.
pub fn format_steps(stepper: &Stepper, analysis: &FrameAnalysis, steps: &[TimeRange]) -> String {
    let mut out = String::new();

    out.push_str("=== axm - Time frame steps ===\n");
    out.push_str(&format!("Frame: {}\n", stepper.spec()));
    out.push_str(&format!(
        "Ghost: {}\n",
        stepper.ghost().map(|g| g.to_string()).unwrap_or_else(|| "none".to_string())
    ));
    out.push_str(&format!("Within: {}\n", analysis.within.format(TIME_FORMAT)));
    out.push_str(&format!(
        "Range: [{}..{}) = {}\n",
        analysis.inc_start.format(TIME_FORMAT),
        analysis.exc_end.format(TIME_FORMAT),
        format_duration(analysis.range().duration())
    ));
    out.push_str(&format!("Steps: {}\n\n", steps.len()));

    out.push_str(
        format!(
            "{:>4} {:<19} {:<19} {:<19} {:<16}",
            "#", "anchor", "inc_begin", "exc_end", "duration"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:->4} {:-<19} {:-<19} {:-<19} {:-<16}", "", "", "", "", "").trim_end());
    out.push('\n');

    for (i, step) in steps.iter().enumerate() {
        out.push_str(
            format!(
                "{:>4} {:<19} {:<19} {:<19} {:<16}",
                i,
                fmt_time(step.anchor()),
                fmt_time(step.inc_begin()),
                fmt_time(step.exc_end()),
                format_duration(step.duration())
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format the run summary: one line per series with its reduced value.
pub fn format_run_summary(entries: &[SeriesEntry], generated_at: NaiveDateTime) -> String {
    let mut out = String::new();

    out.push_str("=== axm - Query run ===\n");
    out.push_str(&format!("Now: {}\n", generated_at.format(TIME_FORMAT)));
    out.push_str(&format!("Series: {}\n\n", entries.len()));

    out.push_str(
        format!(
            "{:<40} {:<20} {:<12} {:>6} {:>7} {:<5} {:>14}",
            "series", "label", "ghost", "points", "missing", "func", "value"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<40} {:-<20} {:-<12} {:->6} {:->7} {:-<5} {:->14}",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for entry in entries {
        let s = &entry.series;
        out.push_str(
            format!(
                "{:<40} {:<20} {:<12} {:>6} {:>7} {:<5} {:>14}",
                truncate(&s.id, 40),
                truncate(&s.label, 20),
                s.ghost.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string()),
                s.count_points(),
                s.count_missing(),
                s.reduce.to_string(),
                entry.reduced.map(|v| format!("{v:.4}")).unwrap_or_else(|| "n/a".to_string())
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_time(t: Option<NaiveDateTime>) -> String {
    t.map(|t| t.format(TIME_FORMAT).to_string()).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
