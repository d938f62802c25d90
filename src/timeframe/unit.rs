//! Calendar units and their two primitive operations.
//!
//! Every [`TimeUnit`] knows how to:
//! - round a timestamp down to the start of the unit period containing it
//! - shift a timestamp by a signed number of whole units
//!
//! Fixed-length units (SECOND..WEEK) shift by exact durations. MONTH and
//! QUARTER shift the month number with carry into the year; YEAR replaces the
//! year. When the target month is shorter than the source day-of-month the day
//! is clamped to the month's last day (Jan 31 + 1 MONTH = Feb 28).

use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::FrameError;

/// First day of the week used by [`TimeUnit::round_down`], as an offset from Sunday.
pub const WEEK_FIRST_DAY: i32 = 0;

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 60 * MINUTE_SECS;
const DAY_SECS: i64 = 24 * HOUR_SECS;

/// Closed set of time units usable for ranges, granularity and smoothing.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TimeUnit {
    Second,
    Minute,
    Minute5,
    Minute10,
    Minute15,
    Minute30,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    /// Parse a unit name, attributing failures to `field`.
    pub fn parse_field(field: &'static str, value: &str) -> Result<Self, FrameError> {
        value.trim().parse().map_err(|_| FrameError::InvalidUnit {
            field,
            value: value.to_string(),
        })
    }

    /// Round `t` down to the start of the unit period containing it.
    ///
    /// WEEK uses [`WEEK_FIRST_DAY`]. Returns `None` when the period start
    /// precedes chrono's calendar.
    pub fn round_down(self, t: NaiveDateTime) -> Option<NaiveDateTime> {
        self.round_down_with(t, WEEK_FIRST_DAY)
    }

    /// Round `t` down, with an explicit first day of week for WEEK.
    ///
    /// `week_first_day` is an offset from Sunday taken modulo 7
    /// (`1` = Monday, `-1` = Saturday). Other units ignore it.
    pub fn round_down_with(self, t: NaiveDateTime, week_first_day: i32) -> Option<NaiveDateTime> {
        let date = t.date();
        let floored = match self {
            TimeUnit::Second => floor_within_day(t, 1),
            TimeUnit::Minute => floor_within_day(t, MINUTE_SECS),
            TimeUnit::Minute5 => floor_within_day(t, 5 * MINUTE_SECS),
            TimeUnit::Minute10 => floor_within_day(t, 10 * MINUTE_SECS),
            TimeUnit::Minute15 => floor_within_day(t, 15 * MINUTE_SECS),
            TimeUnit::Minute30 => floor_within_day(t, 30 * MINUTE_SECS),
            TimeUnit::Hour => floor_within_day(t, HOUR_SECS),
            TimeUnit::Day => midnight(date),
            TimeUnit::Week => {
                let weekday = date.weekday().num_days_from_sunday() as i32;
                let back = (weekday - week_first_day.rem_euclid(7)).rem_euclid(7);
                midnight(date.checked_sub_days(Days::new(back as u64))?)
            }
            TimeUnit::Month => midnight(date.with_day(1)?),
            TimeUnit::Quarter => {
                let month = (date.month0() / 3) * 3 + 1;
                midnight(first_of_month(date.year(), month)?)
            }
            TimeUnit::Year => midnight(first_of_month(date.year(), 1)?),
        };
        Some(floored)
    }

    /// Shift `t` by `delta` whole units (negative rewinds).
    ///
    /// Returns `None` only when the result is outside chrono's calendar.
    pub fn add(self, t: NaiveDateTime, delta: i64) -> Option<NaiveDateTime> {
        match self {
            TimeUnit::Second => shift_seconds(t, delta, 1),
            TimeUnit::Minute => shift_seconds(t, delta, MINUTE_SECS),
            TimeUnit::Minute5 => shift_seconds(t, delta, 5 * MINUTE_SECS),
            TimeUnit::Minute10 => shift_seconds(t, delta, 10 * MINUTE_SECS),
            TimeUnit::Minute15 => shift_seconds(t, delta, 15 * MINUTE_SECS),
            TimeUnit::Minute30 => shift_seconds(t, delta, 30 * MINUTE_SECS),
            TimeUnit::Hour => shift_seconds(t, delta, HOUR_SECS),
            TimeUnit::Day => shift_seconds(t, delta, DAY_SECS),
            TimeUnit::Week => shift_seconds(t, delta, 7 * DAY_SECS),
            TimeUnit::Month => shift_months(t, delta),
            TimeUnit::Quarter => shift_months(t, delta.checked_mul(3)?),
            TimeUnit::Year => shift_years(t, delta),
        }
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Floor the time of day to a multiple of `step_secs`, dropping sub-seconds.
fn floor_within_day(t: NaiveDateTime, step_secs: i64) -> NaiveDateTime {
    let secs = i64::from(t.num_seconds_from_midnight());
    midnight(t.date()) + Duration::seconds(secs - secs % step_secs)
}

fn shift_seconds(t: NaiveDateTime, delta: i64, unit_secs: i64) -> Option<NaiveDateTime> {
    let secs = delta.checked_mul(unit_secs)?;
    t.checked_add_signed(Duration::try_seconds(secs)?)
}

fn shift_months(t: NaiveDateTime, delta: i64) -> Option<NaiveDateTime> {
    // Months since year 0; floor division keeps the carry symmetric for negative deltas.
    let total = i64::from(t.year())
        .checked_mul(12)?
        .checked_add(i64::from(t.month0()))?
        .checked_add(delta)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = total.rem_euclid(12) as u32 + 1;
    with_year_month(t, year, month)
}

fn shift_years(t: NaiveDateTime, delta: i64) -> Option<NaiveDateTime> {
    let year = i32::try_from(i64::from(t.year()).checked_add(delta)?).ok()?;
    with_year_month(t, year, t.month())
}

/// Move `t` to `year`/`month`, clamping the day to the month's length.
fn with_year_month(t: NaiveDateTime, year: i32, month: u32) -> Option<NaiveDateTime> {
    let mut day = t.day();
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date.and_time(t.time()));
        }
        if day <= 28 {
            return None;
        }
        day -= 1;
    }
}
