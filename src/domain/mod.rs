//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - metric definitions and their lookup set (`Metric`, `MetricSet`)
//! - measured data (`DataPoint`, `DataSeries`) and reduction (`ReduceFunc`)
//! - query file schema (`QuerySetDef`) and validated queries (`QuerySet`, `Query`)
//! - run configuration and export schemas (`RunConfig`, `SeriesFile`, `StepsReport`)

pub mod metric;
pub mod types;

pub use metric::*;
pub use types::*;
