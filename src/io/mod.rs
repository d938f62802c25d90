//! Input/output helpers.
//!
//! - query file loading + validation (`query`)
//! - series and steps exports to CSV (`export`)
//! - series and steps exports to JSON (`series_json`)

pub mod export;
pub mod query;
pub mod series_json;

pub use export::*;
pub use query::*;
pub use series_json::*;
