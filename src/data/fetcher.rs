use crate::data::RandomFetcher;
use crate::domain::{DataPoint, FetcherId, Metric};
use crate::error::AppError;
use crate::timeframe::TimeRange;

/// Produces one measured value per time range.
///
/// Implementations receive every step of a frame in order and may keep
/// state between calls (connections, cursors, RNGs).
pub trait Fetcher {
    /// Measure `range`. A missing value is reported as `DataPoint::value == None`,
    /// not as an error.
    fn fetch(&mut self, range: &TimeRange) -> Result<DataPoint, AppError>;
}

/// Build the fetcher a metric names, configured from its fetch options.
pub fn fetcher_for(metric: &Metric, seed: u64) -> Result<Box<dyn Fetcher>, AppError> {
    match metric.fetcher {
        FetcherId::Random => Ok(Box::new(RandomFetcher::new(metric.fetch, seed)?)),
    }
}
