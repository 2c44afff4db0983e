//! pprof measurement: periodic fan-out profile collection.
//!
//! - [`PprofMeasurement`]: interval loop over all configured targets
//! - [`remote`]: per-endpoint command building and artifact handling

mod collector;
pub mod remote;

pub use collector::{PPROF_MEASUREMENT, PassSummary, PprofMeasurement};
