//! Shared query pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load queries -> pin now -> one stepper per (query, ghost, metric) -> fetch each step -> reduce
//!
//! Front-ends (terminal table, CSV, JSON) then focus on presentation.

use std::iter;

use chrono::{Local, NaiveDateTime};
use rayon::prelude::*;

use crate::data::{fetcher_for, series_seed};
use crate::domain::{DataSeries, Metric, MetricSet, Query, QueryMetric, QuerySet, RunConfig, SeriesEntry};
use crate::error::AppError;
use crate::timeframe::{Ghost, Stepper};

const LOG_TARGET: &str = " pipeline";

/// All computed outputs of a single `axm run`.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The "now" every stepper in the run was pinned to.
    pub generated_at: NaiveDateTime,
    pub metrics: MetricSet,
    /// Query order; within a query the base series first, then each ghost's,
    /// each group in metric order.
    pub entries: Vec<SeriesEntry>,
}

/// One series to compute.
struct Job<'a> {
    query: &'a Query,
    ghost: Option<Ghost>,
    /// 1-based position of the metric in its query.
    n: usize,
    qmetric: &'a QueryMetric,
}

/// Load the configured query file and run it.
pub fn run_queries(config: &RunConfig) -> Result<RunOutput, AppError> {
    let set = crate::io::load_query_set(&config.queries_path)?;
    let now = config.reframe.unwrap_or_else(|| Local::now().naive_local());
    run_query_set(&set, now, config.seed)
}

/// Run a validated query set with a pinned `now`.
///
/// Series are computed in parallel; the output order does not depend on
/// scheduling.
pub fn run_query_set(set: &QuerySet, now: NaiveDateTime, seed: u64) -> Result<RunOutput, AppError> {
    let jobs: Vec<Job> = set
        .queries
        .iter()
        .flat_map(|query| {
            iter::once(None)
                .chain(query.ghosts.iter().copied().map(Some))
                .flat_map(move |ghost| {
                    query.metrics.iter().enumerate().map(move |(i, qmetric)| Job {
                        query,
                        ghost,
                        n: i + 1,
                        qmetric,
                    })
                })
        })
        .collect();
    log::info!(
        target: LOG_TARGET,
        "Running {} queries as {} series at {now}",
        set.queries.len(),
        jobs.len()
    );

    let entries = jobs
        .par_iter()
        .map(|job| run_series(set, job, now, seed))
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(RunOutput {
        generated_at: now,
        metrics: set.metrics.clone(),
        entries,
    })
}

/// Prefix shared by every series of one (query, ghost) pair:
/// `Q_<query>_M_` for the base frame, `Q_<query>_G_<ghost>_` for ghosts.
pub fn series_prefix(query: &Query, ghost: Option<Ghost>) -> String {
    match ghost {
        None => format!("Q_{}_M_", query.id),
        Some(g) => format!("Q_{}_G_{g}_", query.id),
    }
}

fn run_series(set: &QuerySet, job: &Job, now: NaiveDateTime, seed: u64) -> Result<SeriesEntry, AppError> {
    let metric = set.metrics.get_metric(&job.qmetric.metric_id)?;
    let divisor = job
        .qmetric
        .div_metric_id
        .as_deref()
        .map(|id| set.metrics.get_metric(id))
        .transpose()?;

    let prefix = series_prefix(job.query, job.ghost);
    let id = match divisor {
        None => format!("{prefix}{}_{}", job.n, metric.id),
        Some(div) => format!("{prefix}{}_{}_div_{}", job.n, metric.id, div.id),
    };
    let spec = job.query.frame.pinned(now);

    let mut series = DataSeries::new(id.clone(), job.query.id.clone(), metric.id.clone(), spec);
    series.label = job.qmetric.label.clone();
    series.ghost = job.ghost;
    series.reduce = metric.func;
    fill_series(&mut series, metric, series_seed(seed, &id), now)?;

    if let Some(div) = divisor {
        let div_id = format!("DIV_{prefix}{}_{}", job.n, div.id);
        let mut div_series = DataSeries::new(div_id.clone(), job.query.id.clone(), div.id.clone(), spec);
        div_series.ghost = job.ghost;
        fill_series(&mut div_series, div, series_seed(seed, &div_id), now)?;
        series.div_series(&div_series);
        series.div_metric_id = Some(div.id.clone());
    }

    log::debug!(
        target: LOG_TARGET,
        "Series {id}: {} points, {} missing",
        series.count_points(),
        series.count_missing()
    );
    Ok(SeriesEntry {
        reduced: series.reduce(metric.func),
        series,
    })
}

fn fill_series(series: &mut DataSeries, metric: &Metric, seed: u64, now: NaiveDateTime) -> Result<(), AppError> {
    let stepper = Stepper::new(series.frame, series.ghost);
    let mut fetcher = fetcher_for(metric, seed)?;
    for step in stepper.steps_at(now)? {
        let mut point = fetcher.fetch(&step)?;
        point.value = point.value.map(|v| metric.data_type.coerce(v));
        series.add_point(point)?;
    }
    Ok(())
}
