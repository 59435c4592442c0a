//! Haar cascade detector: scale binding, window evaluation, scanning and the
//! end-to-end pipeline.
//!
//! Overview
//! - [`ScaledCascade::bind`] rebinds every feature of an immutable
//!   [`Cascade`](crate::cascade::Cascade) to one scale and one integral-image
//!   layout.
//! - [`ScaledCascade::evaluate`] runs the stages over one window and returns
//!   a [`WindowOutcome`].
//! - [`scan`] walks the scale pyramid over a ROI; [`scan_single_size`] scans
//!   one known window size.
//! - [`HaarDetector`] glues integral image, scan and merge together and
//!   reports timings.
//!
//! Modules
//! - [`params`] – scan, merge and pipeline configuration.
//! - `scaling` – the per-scale bound view.
//! - `evaluate` – per-window stage evaluation.
//! - `scan` – scan controller and cooperative abort.
//! - `pipeline` – the [`HaarDetector`] implementation.

mod error;
mod evaluate;
pub mod params;
mod pipeline;
mod scaling;
mod scan;

pub use error::DetectError;
pub use evaluate::WindowOutcome;
pub use params::{DetectorParams, MergeParams, ScanMode, ScanParams};
pub use pipeline::HaarDetector;
pub use scaling::{ScaledCascade, ScaledFeature, ScaledRect};
pub use scan::{
    scan, scan_single_size, scan_with_abort, Deadline, NeverAbort, ScanAbort, ScanOutput,
    ScanStatus,
};
