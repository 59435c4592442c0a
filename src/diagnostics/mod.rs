//! Diagnostics data model returned by the detector and written by the tools.
//!
//! `DetectionReport` is the main entry point: final detections plus a
//! `DetectionTrace` with timings, counts and one `ScaleReport` per scanned
//! scale. Everything serializes to camelCase JSON.

pub mod pipeline;
pub mod scan;
pub mod timing;

pub use pipeline::{DetectionReport, DetectionTrace, InputDescriptor};
pub use scan::ScaleReport;
pub use timing::{StageTiming, TimingBreakdown};
