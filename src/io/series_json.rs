//! JSON exports.
//!
//! The schema is defined by `domain::SeriesFile` (run output) and
//! `domain::StepsReport` (frame steps).

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::SeriesFile;
use crate::error::AppError;

/// Write a run's series to a pretty-printed JSON file.
pub fn write_series_json(path: &Path, file: &SeriesFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(3, format!("Failed to create series JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::new(3, format!("Failed to write series JSON: {e}")))?;
    Ok(())
}

/// Render any export schema as pretty JSON text.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(4, format!("Failed to encode JSON: {e}")))
}
