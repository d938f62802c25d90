use thiserror::Error;

/// Validation and calendar errors raised while building or walking a time frame.
///
/// These are the library's typed errors. The binary converts them into
/// [`AppError`] with exit code 2 (bad configuration).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A unit name that is not one of `SECOND` .. `YEAR`.
    #[error("Invalid time unit for `{field}`: '{value}'")]
    InvalidUnit { field: &'static str, value: String },

    /// A mode name that is not `CURRENT` or `LASTWHOLE`.
    #[error("Invalid mode: '{0}' (expected CURRENT or LASTWHOLE)")]
    InvalidMode(String),

    /// A ghost name outside `PREV_PERIOD1|2`, `PREV_YEAR1|2`.
    #[error("Invalid ghost type: '{0}'")]
    InvalidGhost(String),

    /// A well-typed value outside its allowed domain (e.g. `range_val = 0`).
    #[error("Invalid value for `{field}`: {value} ({reason})")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Text that does not parse as a date or date-time.
    #[error("Invalid date-time for `{field}`: '{value}'")]
    InvalidDateTime { field: &'static str, value: String },

    /// A time range used before both of its bounds were set.
    #[error("Time range missing {0} point")]
    MissingBound(&'static str),

    /// Period arithmetic left the representable calendar.
    #[error("Time frame falls outside the representable calendar range")]
    OutOfRange,
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FrameError> for AppError {
    fn from(err: FrameError) -> Self {
        AppError::new(2, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_errors_map_to_config_exit_code() {
        let err: AppError = FrameError::InvalidMode("BOGUS".to_string()).into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("BOGUS"));
    }
}
