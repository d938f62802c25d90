//! Time frame model and stepping engine.
//!
//! A [`FrameSpec`] declares a reporting period relative to "now" (or a
//! reframed instant), how finely to sample it and how to smooth each sample.
//! A [`Stepper`] turns that declaration, optionally shifted by a [`Ghost`],
//! into an ordered sequence of [`TimeRange`] steps, each a half-open interval
//! labelled by its anchor.

pub mod ghost;
pub mod range;
pub mod spec;
pub mod stepper;
pub mod unit;

pub use ghost::*;
pub use range::*;
pub use spec::*;
pub use stepper::*;
pub use unit::*;
