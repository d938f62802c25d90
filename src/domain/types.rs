//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - assembled in memory while stepping through a frame
//! - exported to CSV/JSON
//! - printed by the terminal report

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::domain::{MetricSet, QueryMetric};
use crate::error::FrameError;
use crate::timeframe::{FrameSpec, Ghost, TimeRange};

/// How a series of values is collapsed into one number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ReduceFunc {
    /// Number of values, missing ones included.
    #[default]
    Count,
    /// First present value.
    First,
    /// Last present value.
    Last,
    /// Sum of present values; 0 when none are present.
    Sum,
    Min,
    Max,
    /// Mean of present values.
    Avg,
}

impl ReduceFunc {
    /// Reduce `values`, where `None` marks missing data.
    pub fn apply(self, values: &[Option<f64>]) -> Option<f64> {
        let mut present = values.iter().flatten().copied();
        match self {
            ReduceFunc::Count => Some(values.len() as f64),
            ReduceFunc::First => present.next(),
            ReduceFunc::Last => present.last(),
            ReduceFunc::Sum => Some(present.sum()),
            ReduceFunc::Min => present.reduce(f64::min),
            ReduceFunc::Max => present.reduce(f64::max),
            ReduceFunc::Avg => {
                let (sum, n) = present.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                (n > 0).then(|| sum / n as f64)
            }
        }
    }
}

/// One measurement: a time range and its value, `None` when data is missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub range: TimeRange,
    pub value: Option<f64>,
}

impl DataPoint {
    pub fn new(range: TimeRange, value: Option<f64>) -> Self {
        Self { range, value }
    }

    /// A point is valid when its range is; a missing value is still valid.
    pub fn validate(&self) -> Result<(), FrameError> {
        self.range.validate()
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

/// Ordered points measured for one metric of a query, optionally ghosted.
#[derive(Debug, Clone, Serialize)]
pub struct DataSeries {
    pub id: String,
    pub query_id: String,
    pub metric_id: String,
    /// Set when values are ratios over a second metric.
    pub div_metric_id: Option<String>,
    pub label: String,
    pub ghost: Option<Ghost>,
    pub frame: FrameSpec,
    pub reduce: ReduceFunc,
    points: Vec<DataPoint>,
}

impl DataSeries {
    pub fn new(
        id: impl Into<String>,
        query_id: impl Into<String>,
        metric_id: impl Into<String>,
        frame: FrameSpec,
    ) -> Self {
        Self {
            id: id.into(),
            query_id: query_id.into(),
            metric_id: metric_id.into(),
            div_metric_id: None,
            label: String::new(),
            ghost: None,
            frame,
            reduce: ReduceFunc::default(),
            points: Vec::new(),
        }
    }

    /// Append a point, rejecting ranges with unset bounds.
    pub fn add_point(&mut self, point: DataPoint) -> Result<(), FrameError> {
        point.validate()?;
        self.points.push(point);
        Ok(())
    }

    pub fn count_points(&self) -> usize {
        self.points.len()
    }

    pub fn count_missing(&self) -> usize {
        self.points.iter().filter(|p| p.is_missing()).count()
    }

    pub fn get_point(&self, idx: usize) -> Option<&DataPoint> {
        self.points.get(idx)
    }

    pub fn iter_points(&self) -> std::slice::Iter<'_, DataPoint> {
        self.points.iter()
    }

    pub fn reset_points(&mut self) {
        self.points.clear();
    }

    /// Divide each value by the value at the same index in `divisor`.
    ///
    /// The result is `None` where either side is missing, where `divisor` has
    /// no point at that index, or where the divisor is zero.
    pub fn div_series(&mut self, divisor: &DataSeries) {
        for (idx, point) in self.points.iter_mut().enumerate() {
            let denom = divisor.get_point(idx).and_then(|p| p.value).filter(|d| *d != 0.0);
            point.value = match (point.value, denom) {
                (Some(v), Some(d)) => Some(v / d),
                _ => None,
            };
        }
    }

    /// Collapse the series with `func`.
    pub fn reduce(&self, func: ReduceFunc) -> Option<f64> {
        let values: Vec<Option<f64>> = self.points.iter().map(|p| p.value).collect();
        func.apply(&values)
    }
}

/// Terminal/stdout rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

/// Verbosity accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    None,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `env_logger` filter string for this level.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::None => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Options for the random value source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FetchOptions {
    pub min: f64,
    pub max: f64,
    /// Round each value to the nearest integer.
    pub round: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            round: false,
        }
    }
}

/// Raw `fetch:` block; absent keys fall back to table defaults, then [`FetchOptions::default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchOptionsDef {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub round: Option<bool>,
}

impl FetchOptionsDef {
    /// Keys set here win over `base`.
    pub fn merged_over(self, base: FetchOptionsDef) -> FetchOptionsDef {
        FetchOptionsDef {
            min: self.min.or(base.min),
            max: self.max.or(base.max),
            round: self.round.or(base.round),
        }
    }

    pub fn resolve(self) -> FetchOptions {
        let defaults = FetchOptions::default();
        FetchOptions {
            min: self.min.unwrap_or(defaults.min),
            max: self.max.unwrap_or(defaults.max),
            round: self.round.unwrap_or(defaults.round),
        }
    }
}

/// Raw filter entry of a metric definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterDef {
    pub field: String,
    #[serde(default)]
    pub op: Option<String>,
    /// Any scalar; compared as text.
    pub value: serde_yaml::Value,
}

/// Raw metric definition, also used for `table_defaults` entries.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MetricDef {
    pub id: Option<String>,
    pub fetcher: Option<String>,
    pub fetch: Option<FetchOptionsDef>,
    pub table: Option<String>,
    pub func: Option<String>,
    pub time_field: Option<String>,
    pub time_type: Option<String>,
    pub data_field: Option<String>,
    pub data_type: Option<String>,
    pub filters: Option<Vec<FilterDef>>,
}

impl MetricDef {
    /// Fill every key this definition leaves out from `base`.
    ///
    /// `fetch` merges key by key; `filters` are replaced as a whole.
    pub fn merged_over(self, base: &MetricDef) -> MetricDef {
        let fetch = match (self.fetch, base.fetch) {
            (Some(own), Some(inherited)) => Some(own.merged_over(inherited)),
            (own, inherited) => own.or(inherited),
        };
        MetricDef {
            id: self.id.or_else(|| base.id.clone()),
            fetcher: self.fetcher.or_else(|| base.fetcher.clone()),
            fetch,
            table: self.table.or_else(|| base.table.clone()),
            func: self.func.or_else(|| base.func.clone()),
            time_field: self.time_field.or_else(|| base.time_field.clone()),
            time_type: self.time_type.or_else(|| base.time_type.clone()),
            data_field: self.data_field.or_else(|| base.data_field.clone()),
            data_type: self.data_type.or_else(|| base.data_type.clone()),
            filters: self.filters.or_else(|| base.filters.clone()),
        }
    }
}

/// Raw entry of a query's `metrics:` list.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryMetricDef {
    pub metric: String,
    #[serde(default)]
    pub divide_by_metric: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Raw `timeframe:` block of a query file, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeframeDef {
    pub range_unit: Option<String>,
    pub range_val: Option<i64>,
    pub gran_unit: Option<String>,
    pub smooth_unit: Option<String>,
    pub smooth_val: Option<i64>,
    pub mode: Option<String>,
    pub reframe_dt: Option<String>,
    pub accumulate: Option<bool>,
    pub allow_overflow_begin: Option<bool>,
    pub allow_overflow_end: Option<bool>,
}

/// Raw query entry of a query file, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryDef {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub timeframe: TimeframeDef,
    pub metrics: Vec<QueryMetricDef>,
    #[serde(default)]
    pub ghosts: Vec<String>,
}

/// Top-level layout of a query file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuerySetDef {
    /// Shared settings for every metric naming the same `table`.
    #[serde(default)]
    pub table_defaults: Vec<MetricDef>,
    pub metrics: Vec<MetricDef>,
    pub queries: Vec<QueryDef>,
}

/// A validated query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub id: String,
    pub label: String,
    pub frame: FrameSpec,
    pub metrics: Vec<QueryMetric>,
    pub ghosts: Vec<Ghost>,
}

/// Validated query file: metric definitions plus the queries using them.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySet {
    pub metrics: MetricSet,
    pub queries: Vec<Query>,
}

/// A full `axm run` configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub queries_path: PathBuf,
    /// Substitute for "now" across the whole run.
    pub reframe: Option<NaiveDateTime>,
    pub seed: u64,
    pub format: OutputFormat,
    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

/// One series with its reduced value, as exported.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesEntry {
    #[serde(flatten)]
    pub series: DataSeries,
    pub reduced: Option<f64>,
}

/// JSON export schema for `axm run`.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesFile {
    pub tool: String,
    pub generated_at: NaiveDateTime,
    /// Definitions of every metric the series were fetched for.
    pub metrics: MetricSet,
    pub series: Vec<SeriesEntry>,
}

/// JSON schema for `axm steps --format json`.
#[derive(Debug, Clone, Serialize)]
pub struct StepsReport {
    pub frame: FrameSpec,
    pub ghost: Option<Ghost>,
    pub range: TimeRange,
    pub steps: Vec<TimeRange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2014, 4, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn series_of(values: &[Option<f64>]) -> DataSeries {
        let mut series = DataSeries::new("Q_q1_M_1_m1", "q1", "m1", FrameSpec::default());
        for (i, v) in values.iter().enumerate() {
            let d = i as u32 + 1;
            let range = TimeRange::new(day(d), day(d + 1)).with_anchor(day(d));
            series.add_point(DataPoint::new(range, *v)).unwrap();
        }
        series
    }

    #[test]
    fn reduce_skips_missing_values() {
        let vals = [None, Some(3.0), None, Some(1.0), Some(5.0), None];
        assert_eq!(ReduceFunc::Count.apply(&vals), Some(6.0));
        assert_eq!(ReduceFunc::First.apply(&vals), Some(3.0));
        assert_eq!(ReduceFunc::Last.apply(&vals), Some(5.0));
        assert_eq!(ReduceFunc::Sum.apply(&vals), Some(9.0));
        assert_eq!(ReduceFunc::Min.apply(&vals), Some(1.0));
        assert_eq!(ReduceFunc::Max.apply(&vals), Some(5.0));
        assert_eq!(ReduceFunc::Avg.apply(&vals), Some(3.0));
    }

    #[test]
    fn reduce_all_missing() {
        let vals = [None, None];
        assert_eq!(ReduceFunc::Count.apply(&vals), Some(2.0));
        assert_eq!(ReduceFunc::First.apply(&vals), None);
        assert_eq!(ReduceFunc::Last.apply(&vals), None);
        assert_eq!(ReduceFunc::Sum.apply(&vals), Some(0.0));
        assert_eq!(ReduceFunc::Min.apply(&vals), None);
        assert_eq!(ReduceFunc::Max.apply(&vals), None);
        assert_eq!(ReduceFunc::Avg.apply(&vals), None);
    }

    #[test]
    fn reduce_names() {
        assert_eq!("AVG".parse::<ReduceFunc>(), Ok(ReduceFunc::Avg));
        assert!("MEDIAN".parse::<ReduceFunc>().is_err());
        assert_eq!(ReduceFunc::default(), ReduceFunc::Count);
    }

    #[test]
    fn series_rejects_unbounded_points() {
        let mut series = series_of(&[Some(1.0)]);
        let mut open = TimeRange::default();
        open.set_inc_begin(day(9));
        let err = series.add_point(DataPoint::new(open, Some(2.0))).unwrap_err();
        assert_eq!(err, FrameError::MissingBound("end"));
        assert_eq!(series.count_points(), 1);
    }

    #[test]
    fn series_counts_and_access() {
        let mut series = series_of(&[Some(1.0), None, Some(4.0)]);
        assert_eq!(series.count_points(), 3);
        assert_eq!(series.count_missing(), 1);
        assert_eq!(series.get_point(2).and_then(|p| p.value), Some(4.0));
        assert!(series.get_point(3).is_none());
        assert_eq!(series.iter_points().filter(|p| p.is_valid()).count(), 3);
        assert_eq!(series.reduce(ReduceFunc::Sum), Some(5.0));
        series.reset_points();
        assert_eq!(series.count_points(), 0);
    }

    #[test]
    fn metric_def_inherits_missing_keys() {
        let base = MetricDef {
            fetcher: Some("random".to_string()),
            table: Some("signups".to_string()),
            time_field: Some("created_at".to_string()),
            func: Some("SUM".to_string()),
            fetch: Some(FetchOptionsDef { min: Some(5.0), max: Some(9.0), round: None }),
            ..Default::default()
        };
        let own = MetricDef {
            id: Some("pro_signups".to_string()),
            table: Some("signups".to_string()),
            func: Some("MAX".to_string()),
            fetch: Some(FetchOptionsDef { min: None, max: Some(50.0), round: Some(true) }),
            ..Default::default()
        };

        let merged = own.merged_over(&base);
        assert_eq!(merged.id.as_deref(), Some("pro_signups"));
        assert_eq!(merged.func.as_deref(), Some("MAX"));
        assert_eq!(merged.fetcher.as_deref(), Some("random"));
        assert_eq!(merged.time_field.as_deref(), Some("created_at"));
        assert!(merged.data_type.is_none());
        assert_eq!(
            merged.fetch.map(FetchOptionsDef::resolve),
            Some(FetchOptions { min: 5.0, max: 50.0, round: true })
        );
        assert_eq!(FetchOptionsDef::default().resolve(), FetchOptions::default());
    }

    #[test]
    fn div_series_propagates_missing() {
        let mut numer = series_of(&[Some(10.0), Some(6.0), None, Some(8.0), Some(3.0)]);
        let denom = series_of(&[Some(2.0), None, Some(4.0), Some(0.0)]);
        numer.div_series(&denom);
        let values: Vec<_> = numer.iter_points().map(|p| p.value).collect();
        assert_eq!(values, vec![Some(5.0), None, None, None, None]);
    }
}
