//! Seeded uniform random measurements.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::data::Fetcher;
use crate::domain::{DataPoint, FetchOptions};
use crate::error::AppError;
use crate::timeframe::TimeRange;

/// Draws each value uniformly from `[min, max)`, optionally rounded.
#[derive(Debug, Clone)]
pub struct RandomFetcher {
    options: FetchOptions,
    rng: StdRng,
}

impl RandomFetcher {
    pub fn new(options: FetchOptions, seed: u64) -> Result<Self, AppError> {
        validate_fetch_options(&options)?;
        Ok(Self {
            options,
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Fetcher for RandomFetcher {
    fn fetch(&mut self, range: &TimeRange) -> Result<DataPoint, AppError> {
        range
            .validate()
            .map_err(|e| AppError::new(4, format!("Refusing to fetch unbounded range: {e}")))?;

        let FetchOptions { min, max, round } = self.options;
        let mut value = min + self.rng.gen_range(0.0..1.0) * (max - min);
        if round {
            value = value.round();
        }
        Ok(DataPoint::new(*range, Some(value)))
    }
}

/// Reject non-finite or inverted bounds.
pub fn validate_fetch_options(options: &FetchOptions) -> Result<(), AppError> {
    if !(options.min.is_finite() && options.max.is_finite()) {
        return Err(AppError::new(2, "Fetch bounds must be finite numbers."));
    }
    if options.max < options.min {
        return Err(AppError::new(
            2,
            format!("Fetch bounds inverted: min {} > max {}", options.min, options.max),
        ));
    }
    Ok(())
}

/// Derive a per-series seed from the run seed and the series identity.
pub fn series_seed(run_seed: u64, series_id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    run_seed.hash(&mut hasher);
    series_id.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> TimeRange {
        let begin = NaiveDate::from_ymd_opt(2014, 2, 14).unwrap().and_hms_opt(0, 0, 0).unwrap();
        TimeRange::new(begin, begin + chrono::Duration::days(1)).with_anchor(begin)
    }

    #[test]
    fn values_stay_in_bounds() {
        let options = FetchOptions { min: 10.0, max: 20.0, round: false };
        let mut fetcher = RandomFetcher::new(options, 7).unwrap();
        for _ in 0..200 {
            let point = fetcher.fetch(&range()).unwrap();
            let v = point.value.unwrap();
            assert!((10.0..20.0).contains(&v), "{v}");
            assert_eq!(point.range, range());
        }
    }

    #[test]
    fn rounding_yields_integers() {
        let options = FetchOptions { min: 0.0, max: 5.0, round: true };
        let mut fetcher = RandomFetcher::new(options, 1).unwrap();
        for _ in 0..50 {
            let v = fetcher.fetch(&range()).unwrap().value.unwrap();
            assert_eq!(v, v.round());
            assert!((0.0..=5.0).contains(&v));
        }
    }

    #[test]
    fn same_seed_same_values() {
        let options = FetchOptions::default();
        let mut a = RandomFetcher::new(options, 42).unwrap();
        let mut b = RandomFetcher::new(options, 42).unwrap();
        for _ in 0..10 {
            assert_eq!(a.fetch(&range()).unwrap(), b.fetch(&range()).unwrap());
        }
    }

    #[test]
    fn degenerate_bounds_are_constant() {
        let options = FetchOptions { min: 3.0, max: 3.0, round: false };
        let mut fetcher = RandomFetcher::new(options, 9).unwrap();
        assert_eq!(fetcher.fetch(&range()).unwrap().value, Some(3.0));
    }

    #[test]
    fn rejects_bad_options() {
        let inverted = FetchOptions { min: 5.0, max: 1.0, round: false };
        assert_eq!(RandomFetcher::new(inverted, 0).unwrap_err().exit_code(), 2);
        let nan = FetchOptions { min: f64::NAN, max: 1.0, round: false };
        assert!(RandomFetcher::new(nan, 0).is_err());
    }

    #[test]
    fn unbounded_range_is_refused() {
        let mut fetcher = RandomFetcher::new(FetchOptions::default(), 0).unwrap();
        assert_eq!(fetcher.fetch(&TimeRange::default()).unwrap_err().exit_code(), 4);
    }

    #[test]
    fn series_seed_depends_on_identity() {
        assert_eq!(series_seed(42, "Q_a_M"), series_seed(42, "Q_a_M"));
        assert_ne!(series_seed(42, "Q_a_M"), series_seed(42, "Q_a_G_PREV_YEAR1"));
    }
}
