//! Query file loading and validation.
//!
//! A query file is YAML (see `domain::QuerySetDef`): metric definitions,
//! optional per-table defaults for them, and the queries. Loading is strict:
//! unknown keys, bad names, dangling metric ids and out-of-domain values are
//! all rejected with exit code 2 and a message naming the metric or query.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::data::validate_fetch_options;
use crate::domain::{
    FetcherId, Filter, FilterDef, Metric, MetricDef, MetricSet, Query, QueryDef, QueryMetric, QuerySet,
    QuerySetDef, TimeframeDef,
};
use crate::error::{AppError, FrameError};
use crate::timeframe::{FrameSpec, Ghost, Mode, TimeUnit};

const LOG_TARGET: &str = "    query";

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Parse a date or date-time; a bare date means midnight.
pub fn parse_datetime(field: &'static str, value: &str) -> Result<NaiveDateTime, FrameError> {
    let text = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| FrameError::InvalidDateTime {
            field,
            value: value.to_string(),
        })
}

/// Load and validate a query file.
pub fn load_query_set(path: &Path) -> Result<QuerySet, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read query file '{}': {e}", path.display())))?;
    let set = parse_query_set(&text)
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))?;
    log::info!(
        target: LOG_TARGET,
        "Loaded {} metrics and {} queries from '{}'",
        set.metrics.count_metrics(),
        set.queries.len(),
        path.display()
    );
    Ok(set)
}

/// Parse and validate query YAML.
pub fn parse_query_set(text: &str) -> Result<QuerySet, AppError> {
    let def: QuerySetDef =
        serde_yaml::from_str(text).map_err(|e| AppError::new(2, format!("Invalid query file: {e}")))?;
    let metrics = build_metric_set(def.table_defaults, def.metrics)?;

    if def.queries.is_empty() {
        return Err(AppError::new(2, "Query file defines no queries."));
    }
    let mut seen = HashSet::new();
    let mut queries = Vec::with_capacity(def.queries.len());
    for query in def.queries {
        if !seen.insert(query.id.clone()) {
            return Err(AppError::new(2, format!("Duplicate query id '{}'", query.id)));
        }
        let id = query.id.clone();
        let query = build_query(query, &metrics).map_err(|e| AppError::new(2, format!("Query '{id}': {e}")))?;
        queries.push(query);
    }
    Ok(QuerySet { metrics, queries })
}

/// Resolve table defaults into each metric definition and validate the result.
pub fn build_metric_set(table_defaults: Vec<MetricDef>, metrics: Vec<MetricDef>) -> Result<MetricSet, AppError> {
    let mut defaults: HashMap<String, MetricDef> = HashMap::new();
    for def in table_defaults {
        match def.table.clone().filter(|t| !t.trim().is_empty()) {
            Some(table) => {
                defaults.insert(table, def);
            }
            None => return Err(AppError::new(2, "Table default missing table")),
        }
    }

    if metrics.is_empty() {
        return Err(AppError::new(2, "Query file defines no metrics."));
    }
    let mut set = MetricSet::new();
    for def in metrics {
        let base = def.table.as_ref().and_then(|t| defaults.get(t));
        let def = match base {
            Some(base) => def.merged_over(base),
            None => def,
        };
        let id = def.id.clone().unwrap_or_default();
        let metric = build_metric(def).map_err(|e| AppError::new(2, format!("Metric '{id}': {e}")))?;
        if set.add_metric(metric).is_some() {
            return Err(AppError::new(2, format!("Duplicate metric id '{id}'")));
        }
    }
    set.validate()?;
    Ok(set)
}

fn build_metric(def: MetricDef) -> Result<Metric, AppError> {
    let id = def.id.unwrap_or_default();
    if id.trim().is_empty() {
        return Err(AppError::new(2, "id must not be empty"));
    }
    let fetcher = match def.fetcher.as_deref() {
        None => return Err(AppError::new(2, "Missing fetcher")),
        Some(name) => parse_choice::<FetcherId>("fetcher", name)?,
    };
    let fetch = def.fetch.unwrap_or_default().resolve();
    validate_fetch_options(&fetch)?;

    let filters = def
        .filters
        .unwrap_or_default()
        .into_iter()
        .map(build_filter)
        .collect::<Result<Vec<_>, _>>()?;

    let metric = Metric {
        id,
        fetcher,
        fetch,
        table: def.table.unwrap_or_default(),
        func: parse_optional_choice("func", def.func.as_deref())?,
        time_field: def.time_field.unwrap_or_default(),
        time_type: parse_optional_choice("time_type", def.time_type.as_deref())?,
        data_field: def.data_field.unwrap_or_default(),
        data_type: parse_optional_choice("data_type", def.data_type.as_deref())?,
        filters,
    };
    metric.validate()?;
    Ok(metric)
}

fn build_filter(def: FilterDef) -> Result<Filter, AppError> {
    let value = match def.value {
        serde_yaml::Value::String(text) => text,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => {
            return Err(AppError::new(
                2,
                format!("Filter on '{}' needs a scalar value, got {other:?}", def.field),
            ));
        }
    };
    Ok(Filter {
        field: def.field,
        op: parse_optional_choice("filter op", def.op.as_deref())?,
        value,
    })
}

fn parse_choice<T: FromStr>(field: &str, name: &str) -> Result<T, AppError> {
    name.trim()
        .parse()
        .map_err(|_| AppError::new(2, format!("Invalid {field}: '{name}'")))
}

fn parse_optional_choice<T: FromStr + Default>(field: &str, name: Option<&str>) -> Result<T, AppError> {
    name.map_or_else(|| Ok(T::default()), |name| parse_choice(field, name))
}

fn build_query(def: QueryDef, metrics: &MetricSet) -> Result<Query, AppError> {
    if def.id.trim().is_empty() {
        return Err(AppError::new(2, "id must not be empty"));
    }

    let frame = build_frame(&def.timeframe)?;

    let mut ghosts = Vec::with_capacity(def.ghosts.len());
    for name in &def.ghosts {
        let ghost: Ghost = name.parse()?;
        if ghosts.contains(&ghost) {
            return Err(AppError::new(2, format!("Ghost {ghost} listed twice")));
        }
        ghosts.push(ghost);
    }

    if def.metrics.is_empty() {
        return Err(AppError::new(2, "No metrics listed"));
    }
    let mut qmetrics = Vec::with_capacity(def.metrics.len());
    for m in def.metrics {
        metrics.get_metric(&m.metric)?;
        if let Some(div) = &m.divide_by_metric {
            metrics.get_metric(div)?;
        }
        qmetrics.push(QueryMetric {
            label: m.label.unwrap_or_else(|| m.metric.clone()),
            metric_id: m.metric,
            div_metric_id: m.divide_by_metric,
        });
    }

    Ok(Query {
        label: def.label.unwrap_or_else(|| def.id.clone()),
        id: def.id,
        frame,
        metrics: qmetrics,
        ghosts,
    })
}

/// Build a validated frame from its raw definition; absent keys keep defaults.
pub fn build_frame(def: &TimeframeDef) -> Result<FrameSpec, FrameError> {
    let mut builder = FrameSpec::builder();
    if let Some(unit) = &def.range_unit {
        builder = builder.range_unit(TimeUnit::parse_field("range_unit", unit)?);
    }
    if let Some(val) = def.range_val {
        builder = builder.range_val(val);
    }
    if let Some(unit) = &def.gran_unit {
        builder = builder.gran_unit(TimeUnit::parse_field("gran_unit", unit)?);
    }
    if let Some(unit) = &def.smooth_unit {
        builder = builder.smooth_unit(TimeUnit::parse_field("smooth_unit", unit)?);
    }
    if let Some(val) = def.smooth_val {
        builder = builder.smooth_val(val);
    }
    if let Some(mode) = &def.mode {
        builder = builder.mode(mode.parse::<Mode>()?);
    }
    if let Some(dt) = &def.reframe_dt {
        builder = builder.reframe_dt(Some(parse_datetime("reframe_dt", dt)?));
    }
    if let Some(on) = def.accumulate {
        builder = builder.accumulate(on);
    }
    if let Some(on) = def.allow_overflow_begin {
        builder = builder.allow_overflow_begin(on);
    }
    if let Some(on) = def.allow_overflow_end {
        builder = builder.allow_overflow_end(on);
    }
    builder.build()
}
