//! Measurement sources.
//!
//! - the [`Fetcher`] seam a pipeline calls once per step (`fetcher`)
//! - a seeded random source for demos and tests (`random`)

pub mod fetcher;
pub mod random;

pub use fetcher::*;
pub use random::*;
