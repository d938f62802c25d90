//! Time frame stepping: turns a [`FrameSpec`] into measurement [`TimeRange`]s.

use std::fmt;
use std::iter::FusedIterator;

use chrono::{Local, NaiveDateTime};

use super::ghost::Ghost;
use super::range::TimeRange;
use super::spec::{FrameSpec, Mode};
use super::unit::TimeUnit;
use crate::error::FrameError;

const LOG_TARGET: &str = "  stepper";

/// Overall period computed for a stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAnalysis {
    /// Reference time rounded down to the range unit. Not shifted by ghosts.
    pub within: NaiveDateTime,
    pub inc_start: NaiveDateTime,
    pub exc_end: NaiveDateTime,
}

impl FrameAnalysis {
    /// The whole period, anchored at `within`.
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.inc_start, self.exc_end).with_anchor(self.within)
    }
}

/// Generates the ordered measurement steps of a frame, optionally ghosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stepper {
    spec: FrameSpec,
    ghost: Option<Ghost>,
}

impl Stepper {
    pub fn new(spec: FrameSpec, ghost: Option<Ghost>) -> Self {
        Self { spec, ghost }
    }

    pub fn spec(&self) -> &FrameSpec {
        &self.spec
    }

    pub fn ghost(&self) -> Option<Ghost> {
        self.ghost
    }

    pub fn is_ghost(&self, ghost: Ghost) -> bool {
        self.ghost == Some(ghost)
    }

    /// Compute the overall period using the local wall clock when not reframed.
    pub fn analyze(&self) -> Result<FrameAnalysis, FrameError> {
        self.analyze_at(Local::now().naive_local())
    }

    /// Compute the overall period, using `now` when the spec is not reframed.
    pub fn analyze_at(&self, now: NaiveDateTime) -> Result<FrameAnalysis, FrameError> {
        let spec = &self.spec;
        let unit = spec.range_unit();
        let range_val = i64::from(spec.range_val());

        let within = unit
            .round_down(spec.reframe_dt().unwrap_or(now))
            .ok_or(FrameError::OutOfRange)?;

        let mut start = within;
        if range_val > 1 {
            start = shift(unit, start, -(range_val - 1))?;
        }
        if spec.mode() == Mode::LastWhole {
            start = shift(unit, start, -1)?;
        }
        start = match self.ghost {
            None => start,
            Some(Ghost::PrevPeriod1) => shift(unit, start, -range_val)?,
            Some(Ghost::PrevPeriod2) => shift(unit, start, -2 * range_val)?,
            Some(Ghost::PrevYear1) => shift(TimeUnit::Year, start, -1)?,
            Some(Ghost::PrevYear2) => shift(TimeUnit::Year, start, -2)?,
        };

        let exc_end = shift(unit, start, range_val)?;

        log::debug!(
            target: LOG_TARGET,
            "Analyzed {}: within {within}, period [{start}..{exc_end})",
            self
        );
        Ok(FrameAnalysis {
            within,
            inc_start: start,
            exc_end,
        })
    }

    /// Steps of the frame relative to the local wall clock.
    pub fn steps(&self) -> Result<Steps, FrameError> {
        self.steps_at(Local::now().naive_local())
    }

    /// Steps of the frame, using `now` when the spec is not reframed.
    ///
    /// The period is analyzed eagerly so configuration problems surface here
    /// rather than midway through iteration.
    pub fn steps_at(&self, now: NaiveDateTime) -> Result<Steps, FrameError> {
        let analysis = self.analyze_at(now)?;
        Ok(Steps {
            spec: self.spec,
            analysis,
            idx: Some(analysis.inc_start),
        })
    }
}

impl fmt::Display for Stepper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ghost {
            Some(ghost) => write!(f, "Stepper({} ghost {ghost})", self.spec),
            None => write!(f, "Stepper({} ghost None)", self.spec),
        }
    }
}

fn shift(unit: TimeUnit, t: NaiveDateTime, delta: i64) -> Result<NaiveDateTime, FrameError> {
    unit.add(t, delta).ok_or(FrameError::OutOfRange)
}

/// Lazy, finite iterator over the measurement steps of an analyzed frame.
///
/// Each step is anchored at its granularity boundary. Its end is one
/// granularity unit later, clipped to the period end unless end overflow is
/// allowed. Its begin is the anchor, widened back by smoothing from the end,
/// or pinned to the period start when accumulating.
#[derive(Debug, Clone)]
pub struct Steps {
    spec: FrameSpec,
    analysis: FrameAnalysis,
    idx: Option<NaiveDateTime>,
}

impl Steps {
    fn stop(&mut self, what: &str, at: NaiveDateTime) -> Option<TimeRange> {
        log::warn!(
            target: LOG_TARGET,
            "Stopping early: {what} from {at} leaves the representable calendar"
        );
        self.idx = None;
        None
    }
}

impl Iterator for Steps {
    type Item = TimeRange;

    fn next(&mut self) -> Option<TimeRange> {
        let idx = self.idx?;
        let start = self.analysis.inc_start;
        let end = self.analysis.exc_end;
        if idx >= end {
            self.idx = None;
            return None;
        }

        let gran = self.spec.gran_unit();
        let Some(next) = gran.add(idx, 1) else {
            return self.stop("granularity step", idx);
        };

        let mut exc_end = next;
        if !self.spec.allow_overflow_end() && exc_end > end {
            exc_end = end;
        }

        let inc_begin = if self.spec.accumulate() {
            start
        } else {
            let mut begin = idx;
            if self.spec.is_smoothed() {
                let window = -i64::from(self.spec.smooth_val());
                match self.spec.smooth_unit().add(exc_end, window) {
                    Some(t) => begin = t,
                    None => return self.stop("smoothing window", exc_end),
                }
            }
            if !self.spec.allow_overflow_begin() && begin < start {
                begin = start;
            }
            begin
        };

        self.idx = Some(next);
        Some(TimeRange::new(inc_begin, exc_end).with_anchor(idx))
    }
}

impl FusedIterator for Steps {}
