//! Reporting utilities: formatted terminal output for steps and query runs.

pub mod format;

pub use format::*;
