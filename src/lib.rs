//! `ax-metrics` library crate.
//!
//! The binary (`axm`) is a thin wrapper around this library so that:
//!
//! - the time frame engine is testable without spawning processes
//! - modules are reusable by other metrics front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod timeframe;
