//! Half-open time interval `[inc_begin, exc_end)` with an optional anchor label.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Smallest time increment distinguishing inclusive from exclusive bounds.
pub fn timerange_precision() -> Duration {
    Duration::microseconds(1)
}

/// Format a duration as `<days>d HH:MM:SS`, with microseconds when present.
pub fn format_duration(d: Duration) -> String {
    let sign = if d < Duration::zero() { "-" } else { "" };
    let d = d.abs();
    let days = d.num_days();
    let secs = d.num_seconds() - days * 86_400;
    let micros = (d - Duration::seconds(d.num_seconds())).num_microseconds().unwrap_or(0);

    let mut out = format!(
        "{sign}{days}d {:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    );
    if micros != 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out
}

/// A single time range with microsecond-precision bounds and optional anchor.
///
/// The anchor is the label a chart would put on the X axis for this range.
/// It usually equals the beginning but sits inside the range when smoothing
/// widens the begin backwards.
///
/// A range is valid once both bounds are set. Ordering of the bounds is not
/// checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    inc_begin: Option<NaiveDateTime>,
    exc_end: Option<NaiveDateTime>,
    anchor: Option<NaiveDateTime>,
}

impl TimeRange {
    pub fn new(inc_begin: NaiveDateTime, exc_end: NaiveDateTime) -> Self {
        Self {
            inc_begin: Some(inc_begin),
            exc_end: Some(exc_end),
            anchor: None,
        }
    }

    /// Build from inclusive begin and inclusive end (last moment in).
    pub fn from_inclusive(
        inc_begin: NaiveDateTime,
        inc_end: NaiveDateTime,
    ) -> Result<Self, FrameError> {
        let mut range = Self::default();
        range.set_inc_begin(inc_begin);
        range.set_inc_end(inc_end)?;
        Ok(range)
    }

    pub fn with_anchor(mut self, anchor: NaiveDateTime) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn validate(&self) -> Result<(), FrameError> {
        if self.inc_begin.is_none() {
            return Err(FrameError::MissingBound("begin"));
        }
        if self.exc_end.is_none() {
            return Err(FrameError::MissingBound("end"));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn anchor(&self) -> Option<NaiveDateTime> {
        self.anchor
    }

    /// First moment inside the range.
    pub fn inc_begin(&self) -> Option<NaiveDateTime> {
        self.inc_begin
    }

    pub fn set_inc_begin(&mut self, t: NaiveDateTime) {
        self.inc_begin = Some(t);
    }

    /// Last moment before the range, `None` when unset or at the calendar floor.
    pub fn exc_begin(&self) -> Option<NaiveDateTime> {
        self.inc_begin?.checked_sub_signed(timerange_precision())
    }

    /// Fails at the calendar ceiling and leaves the bound unchanged.
    pub fn set_exc_begin(&mut self, t: NaiveDateTime) -> Result<(), FrameError> {
        let begin = t
            .checked_add_signed(timerange_precision())
            .ok_or(FrameError::OutOfRange)?;
        self.inc_begin = Some(begin);
        Ok(())
    }

    /// Last moment inside the range, `None` when unset or at the calendar floor.
    pub fn inc_end(&self) -> Option<NaiveDateTime> {
        self.exc_end?.checked_sub_signed(timerange_precision())
    }

    pub fn set_inc_end(&mut self, t: NaiveDateTime) -> Result<(), FrameError> {
        let end = t
            .checked_add_signed(timerange_precision())
            .ok_or(FrameError::OutOfRange)?;
        self.exc_end = Some(end);
        Ok(())
    }

    /// First moment after the range.
    pub fn exc_end(&self) -> Option<NaiveDateTime> {
        self.exc_end
    }

    pub fn set_exc_end(&mut self, t: NaiveDateTime) {
        self.exc_end = Some(t);
    }

    /// `exc_end - inc_begin`, or zero while either bound is unset.
    pub fn duration(&self) -> Duration {
        match (self.inc_begin, self.exc_end) {
            (Some(begin), Some(end)) => end - begin,
            _ => Duration::zero(),
        }
    }

    /// UNIX seconds of `inc_begin`, reading naive times as UTC.
    pub fn inc_begin_timestamp(&self) -> Option<i64> {
        self.inc_begin().map(|t| t.and_utc().timestamp())
    }

    pub fn exc_begin_timestamp(&self) -> Option<i64> {
        self.exc_begin().map(|t| t.and_utc().timestamp())
    }

    pub fn inc_end_timestamp(&self) -> Option<i64> {
        self.inc_end().map(|t| t.and_utc().timestamp())
    }

    pub fn exc_end_timestamp(&self) -> Option<i64> {
        self.exc_end().map(|t| t.and_utc().timestamp())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(t: Option<NaiveDateTime>) -> String {
            t.map(|t| t.to_string()).unwrap_or_else(|| "None".to_string())
        }
        write!(
            f,
            "TimeRange({} = [{}..{}) anchor {})",
            format_duration(self.duration()),
            opt(self.inc_begin),
            opt(self.exc_end),
            opt(self.anchor)
        )
    }
}
