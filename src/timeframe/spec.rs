//! Declarative time frame: period, granularity, smoothing and overflow policy.
//!
//! Examples representable by a [`FrameSpec`]:
//!
//! - last whole month, daily measurements
//! - current quarter to date, weekly measurements
//! - last 5 days, hourly measurements
//! - 24 hours on a specific past date, every 15 minutes
//! - current month to date, daily measurements of the trailing 7 days
//!
//! A spec is validated once by [`FrameSpecBuilder::build`] and is immutable
//! afterwards, so a [`Stepper`](super::Stepper) always walks a frozen frame.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::Display;

use super::unit::TimeUnit;
use crate::error::FrameError;

/// How the period relates to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Mode {
    /// The period containing now, possibly incomplete ("X to date").
    Current,
    /// The last fully completed period.
    #[value(name = "lastwhole")]
    LastWhole,
}

impl FromStr for Mode {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CURRENT" => Ok(Mode::Current),
            "LASTWHOLE" => Ok(Mode::LastWhole),
            _ => Err(FrameError::InvalidMode(s.to_string())),
        }
    }
}

/// Validated time frame specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSpec {
    range_unit: TimeUnit,
    range_val: u32,
    gran_unit: TimeUnit,
    smooth_unit: TimeUnit,
    smooth_val: u32,
    mode: Mode,
    reframe_dt: Option<NaiveDateTime>,
    accumulate: bool,
    allow_overflow_begin: bool,
    allow_overflow_end: bool,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            range_unit: TimeUnit::Month,
            range_val: 1,
            gran_unit: TimeUnit::Day,
            smooth_unit: TimeUnit::Day,
            smooth_val: 0,
            mode: Mode::Current,
            reframe_dt: None,
            accumulate: false,
            allow_overflow_begin: true,
            allow_overflow_end: false,
        }
    }
}

impl FrameSpec {
    pub fn builder() -> FrameSpecBuilder {
        FrameSpecBuilder::default()
    }

    /// Rounding granularity and semantic unit of the overall period.
    pub fn range_unit(&self) -> TimeUnit {
        self.range_unit
    }

    /// Number of `range_unit`s spanned by the period.
    pub fn range_val(&self) -> u32 {
        self.range_val
    }

    /// Width of each unsmoothed step.
    pub fn gran_unit(&self) -> TimeUnit {
        self.gran_unit
    }

    pub fn smooth_unit(&self) -> TimeUnit {
        self.smooth_unit
    }

    /// Smoothing window in `smooth_unit`s; 0 disables smoothing.
    pub fn smooth_val(&self) -> u32 {
        self.smooth_val
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Substitute for "now" when computing the period.
    pub fn reframe_dt(&self) -> Option<NaiveDateTime> {
        self.reframe_dt
    }

    /// Pin every step's begin to the period begin. Overrides smoothing.
    pub fn accumulate(&self) -> bool {
        self.accumulate
    }

    pub fn allow_overflow_begin(&self) -> bool {
        self.allow_overflow_begin
    }

    pub fn allow_overflow_end(&self) -> bool {
        self.allow_overflow_end
    }

    pub fn is_reframed(&self) -> bool {
        self.reframe_dt.is_some()
    }

    pub fn is_smoothed(&self) -> bool {
        self.smooth_val > 0
    }

    /// Copy of this spec with `reframe_dt` set to `now` unless already reframed.
    ///
    /// Callers running several steppers for one logical operation pin the
    /// frame first so every stepper sees the same "now".
    pub fn pinned(&self, now: NaiveDateTime) -> FrameSpec {
        FrameSpec {
            reframe_dt: Some(self.reframe_dt.unwrap_or(now)),
            ..*self
        }
    }
}

impl fmt::Display for FrameSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} x{} by {}",
            self.mode, self.range_unit, self.range_val, self.gran_unit
        )?;
        if self.accumulate {
            write!(f, ", accumulating")?;
        } else if self.is_smoothed() {
            write!(f, ", smoothed {} {}", self.smooth_val, self.smooth_unit)?;
        }
        if let Some(dt) = self.reframe_dt {
            write!(f, ", reframed at {dt}")?;
        }
        Ok(())
    }
}

/// Builder for [`FrameSpec`] with the documented defaults.
///
/// Integer fields are taken as `i64` so out-of-domain input (negative or
/// zero counts from configuration files) is rejected by [`build`](Self::build)
/// rather than by a lossy conversion at the call site.
#[derive(Debug, Clone)]
pub struct FrameSpecBuilder {
    range_unit: TimeUnit,
    range_val: i64,
    gran_unit: TimeUnit,
    smooth_unit: TimeUnit,
    smooth_val: i64,
    mode: Mode,
    reframe_dt: Option<NaiveDateTime>,
    accumulate: bool,
    allow_overflow_begin: bool,
    allow_overflow_end: bool,
}

impl Default for FrameSpecBuilder {
    fn default() -> Self {
        let spec = FrameSpec::default();
        Self {
            range_unit: spec.range_unit,
            range_val: i64::from(spec.range_val),
            gran_unit: spec.gran_unit,
            smooth_unit: spec.smooth_unit,
            smooth_val: i64::from(spec.smooth_val),
            mode: spec.mode,
            reframe_dt: spec.reframe_dt,
            accumulate: spec.accumulate,
            allow_overflow_begin: spec.allow_overflow_begin,
            allow_overflow_end: spec.allow_overflow_end,
        }
    }
}

impl FrameSpecBuilder {
    pub fn range_unit(mut self, unit: TimeUnit) -> Self {
        self.range_unit = unit;
        self
    }

    pub fn range_val(mut self, val: i64) -> Self {
        self.range_val = val;
        self
    }

    pub fn gran_unit(mut self, unit: TimeUnit) -> Self {
        self.gran_unit = unit;
        self
    }

    pub fn smooth_unit(mut self, unit: TimeUnit) -> Self {
        self.smooth_unit = unit;
        self
    }

    pub fn smooth_val(mut self, val: i64) -> Self {
        self.smooth_val = val;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn reframe_dt(mut self, dt: Option<NaiveDateTime>) -> Self {
        self.reframe_dt = dt;
        self
    }

    pub fn accumulate(mut self, on: bool) -> Self {
        self.accumulate = on;
        self
    }

    pub fn allow_overflow_begin(mut self, on: bool) -> Self {
        self.allow_overflow_begin = on;
        self
    }

    pub fn allow_overflow_end(mut self, on: bool) -> Self {
        self.allow_overflow_end = on;
        self
    }

    /// Validate each field and freeze the spec.
    ///
    /// Checks are per field only. In particular `accumulate` combined with
    /// smoothing is accepted; the stepper ignores smoothing in that case.
    pub fn build(self) -> Result<FrameSpec, FrameError> {
        let range_val = u32::try_from(self.range_val)
            .ok()
            .filter(|v| *v >= 1)
            .ok_or_else(|| FrameError::InvalidValue {
                field: "range_val",
                value: self.range_val.to_string(),
                reason: "must be a positive integer",
            })?;
        let smooth_val = u32::try_from(self.smooth_val).map_err(|_| FrameError::InvalidValue {
            field: "smooth_val",
            value: self.smooth_val.to_string(),
            reason: "must be a non-negative integer",
        })?;

        Ok(FrameSpec {
            range_unit: self.range_unit,
            range_val,
            gran_unit: self.gran_unit,
            smooth_unit: self.smooth_unit,
            smooth_val,
            mode: self.mode,
            reframe_dt: self.reframe_dt,
            accumulate: self.accumulate,
            allow_overflow_begin: self.allow_overflow_begin,
            allow_overflow_end: self.allow_overflow_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn when() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2014, 2, 14)
            .unwrap()
            .and_hms_micro_opt(16, 30, 45, 1234)
            .unwrap()
    }

    #[test]
    fn defaults() {
        let spec = FrameSpec::builder().build().unwrap();
        assert_eq!(spec, FrameSpec::default());
        assert_eq!(spec.range_unit(), TimeUnit::Month);
        assert_eq!(spec.range_val(), 1);
        assert_eq!(spec.gran_unit(), TimeUnit::Day);
        assert_eq!(spec.smooth_unit(), TimeUnit::Day);
        assert_eq!(spec.mode(), Mode::Current);
        assert!(!spec.is_reframed());
        assert!(!spec.is_smoothed());
        assert!(!spec.accumulate());
        assert!(spec.allow_overflow_begin());
        assert!(!spec.allow_overflow_end());
    }

    #[test]
    fn reframe_and_smooth_predicates() {
        let spec = FrameSpec::builder()
            .smooth_unit(TimeUnit::Hour)
            .smooth_val(4)
            .reframe_dt(Some(when()))
            .build()
            .unwrap();
        assert!(spec.is_smoothed());
        assert_eq!(spec.smooth_val(), 4);
        assert!(spec.is_reframed());
        assert_eq!(spec.reframe_dt(), Some(when()));
    }

    #[test]
    fn rejects_out_of_domain_counts() {
        for bad in [0, -3, i64::from(u32::MAX) + 1] {
            let err = FrameSpec::builder().range_val(bad).build().unwrap_err();
            assert!(matches!(err, FrameError::InvalidValue { field: "range_val", .. }), "{bad}");
        }
        let err = FrameSpec::builder().smooth_val(-1).build().unwrap_err();
        assert!(matches!(err, FrameError::InvalidValue { field: "smooth_val", .. }));
    }

    #[test]
    fn accumulate_with_smoothing_is_accepted() {
        let spec = FrameSpec::builder().accumulate(true).smooth_val(7).build().unwrap();
        assert!(spec.accumulate());
        assert!(spec.is_smoothed());
    }

    #[test]
    fn pinned_keeps_existing_reframe() {
        let later = when() + chrono::Duration::days(30);
        let unpinned = FrameSpec::default();
        assert_eq!(unpinned.pinned(later).reframe_dt(), Some(later));

        let reframed = FrameSpec::builder().reframe_dt(Some(when())).build().unwrap();
        assert_eq!(reframed.pinned(later).reframe_dt(), Some(when()));
    }

    #[test]
    fn mode_names() {
        assert_eq!("LASTWHOLE".parse::<Mode>(), Ok(Mode::LastWhole));
        assert_eq!(
            "BOGUSMODE".parse::<Mode>(),
            Err(FrameError::InvalidMode("BOGUSMODE".to_string()))
        );
        assert_eq!(Mode::LastWhole.to_string(), "LASTWHOLE");
    }
}
