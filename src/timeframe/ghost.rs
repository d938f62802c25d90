//! Historical-comparison ("ghost") offsets.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::error::FrameError;

/// Relative shift of a whole frame into the past, for comparison series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Ghost {
    /// The previous period.
    #[serde(rename = "PREV_PERIOD1")]
    #[strum(serialize = "PREV_PERIOD1")]
    PrevPeriod1,
    /// The period before the previous period.
    #[serde(rename = "PREV_PERIOD2")]
    #[strum(serialize = "PREV_PERIOD2")]
    PrevPeriod2,
    /// The same period one year ago.
    #[serde(rename = "PREV_YEAR1")]
    #[strum(serialize = "PREV_YEAR1")]
    PrevYear1,
    /// The same period two years ago.
    #[serde(rename = "PREV_YEAR2")]
    #[strum(serialize = "PREV_YEAR2")]
    PrevYear2,
}

impl FromStr for Ghost {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PREV_PERIOD1" => Ok(Ghost::PrevPeriod1),
            "PREV_PERIOD2" => Ok(Ghost::PrevPeriod2),
            "PREV_YEAR1" => Ok(Ghost::PrevYear1),
            "PREV_YEAR2" => Ok(Ghost::PrevYear2),
            _ => Err(FrameError::InvalidGhost(s.to_string())),
        }
    }
}
