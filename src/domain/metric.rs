//! Metric definitions and the set queries look them up in.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::domain::{FetchOptions, ReduceFunc};
use crate::error::AppError;

/// Data source a metric is fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FetcherId {
    Random,
}

/// Encoding of the time field in the source table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeType {
    #[default]
    TimeEpochSecs,
    TimeEpochMillis,
    TimeDate,
    TimeDatetime,
}

/// Encoding of the data field in the source table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    #[default]
    NumInt,
    NumFloat,
    MoneyFloat,
    /// Integer cents.
    MoneyInt100,
    /// Fractional cents.
    MoneyFloat100,
}

impl DataType {
    /// Coerce a raw fetched value into this type's unit.
    ///
    /// `NUM_INT` rounds to a whole number; the cent types become currency
    /// units rounded to two decimals.
    pub fn coerce(self, raw: f64) -> f64 {
        match self {
            DataType::NumInt => raw.round(),
            DataType::NumFloat | DataType::MoneyFloat => raw,
            DataType::MoneyInt100 | DataType::MoneyFloat100 => raw.round() / 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum FilterOp {
    #[default]
    Eq,
}

/// Field filter applied by the source when fetching a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} '{}'", self.field, self.op, self.value)
    }
}

/// Definition of a single metric and how to obtain it.
///
/// A metric must be able to produce a value for any historical time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub id: String,
    pub fetcher: FetcherId,
    pub fetch: FetchOptions,
    pub table: String,
    /// How the metric's series collapses into one value.
    pub func: ReduceFunc,
    pub time_field: String,
    pub time_type: TimeType,
    pub data_field: String,
    pub data_type: DataType,
    pub filters: Vec<Filter>,
}

impl Metric {
    /// Check required fields and filters.
    pub fn validate(&self) -> Result<(), AppError> {
        let required = [
            ("id", &self.id),
            ("table", &self.table),
            ("time_field", &self.time_field),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::new(2, format!("Missing {name} in metric '{}'", self.id)));
            }
        }
        if let Some(filter) = self.filters.iter().find(|f| f.field.trim().is_empty()) {
            return Err(AppError::new(
                2,
                format!("Metric '{}': filter {filter} has no field", self.id),
            ));
        }
        Ok(())
    }
}

/// Metrics keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSet {
    metrics: BTreeMap<String, Metric>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric, returning the one it replaced.
    pub fn add_metric(&mut self, metric: Metric) -> Option<Metric> {
        self.metrics.insert(metric.id.clone(), metric)
    }

    pub fn count_metrics(&self) -> usize {
        self.metrics.len()
    }

    pub fn get_metric(&self, id: &str) -> Result<&Metric, AppError> {
        self.metrics
            .get(id)
            .ok_or_else(|| AppError::new(2, format!("Unknown metric '{id}'")))
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.metrics.values().try_for_each(Metric::validate)
    }
}

/// One metric a query inspects, optionally as a ratio over a second metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMetric {
    pub metric_id: String,
    pub div_metric_id: Option<String>,
    pub label: String,
}
