#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod bundle;
pub mod cascade;
pub mod cluster;
pub mod detector;
pub mod diagnostics;
pub mod image;
pub mod integral;
pub mod tracking;
pub mod types;

// Tool configuration used by the binaries.
pub mod config;

// --- High-level re-exports -------------------------------------------------

// Main entry points: model, detector and results.
pub use crate::cascade::{Cascade, CascadeError};
pub use crate::detector::{DetectError, DetectorParams, HaarDetector, MergeParams, ScanParams};
pub use crate::integral::{IntegralError, IntegralImage};
pub use crate::types::{Detection, Rect, WindowSize};

// High-level diagnostics returned by the detector.
pub use crate::diagnostics::{DetectionReport, DetectionTrace};

// Merge is usable on its own, e.g. on hits pooled from several scans.
pub use crate::cluster::{merge_detections, merged};

use crate::image::ImageU8;
use std::path::Path;

/// Build the summed-area and squared-sum tables for `image`.
pub fn build_integral(image: ImageU8<'_>) -> Result<IntegralImage, IntegralError> {
    IntegralImage::build(image)
}

/// Load a cascade from a text file or a `.json` flattened table.
pub fn load_cascade(path: &Path) -> Result<Cascade, CascadeError> {
    Cascade::load(path)
}

/// Multi-scale scan of `cascade` over `roi` (full image when `None`),
/// returning the raw, unmerged hits. `max_size = None` scans up to the ROI.
pub fn detect(
    cascade: &Cascade,
    integral: &IntegralImage,
    roi: Option<Rect>,
    scale_step: f64,
    min_size: WindowSize,
    max_size: Option<WindowSize>,
) -> Result<Vec<Detection>, DetectError> {
    let params = ScanParams {
        scale_step,
        min_size,
        max_size,
        ..ScanParams::default()
    };
    detector::scan(cascade, integral, roi, &params).map(|out| out.detections)
}

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use haar_detector::prelude::*;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (w, h) = (640usize, 480usize);
/// let gray = vec![0u8; w * h];
/// let img = ImageU8 { w, h, stride: w, data: &gray };
///
/// let cascade = Cascade::load(Path::new("cascade.txt"))?;
/// let detector = HaarDetector::new(cascade, DetectorParams::default());
/// let report = detector.process_with_diagnostics(img)?;
/// println!("found={} raw={}", report.detections.len(), report.trace.raw_count);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::ImageU8;
    pub use crate::{Cascade, Detection, DetectorParams, HaarDetector, Rect};
}

// --- Stage-level API (for tools & advanced users) --------------------------

pub mod stages {
    // Stage runners.
    pub use crate::detector::{
        scan, scan_single_size, scan_with_abort, Deadline, NeverAbort, ScaledCascade, ScanAbort,
        ScanOutput, ScanStatus, WindowOutcome,
    };

    // Structured diagnostics types.
    pub use crate::diagnostics::{InputDescriptor, ScaleReport, StageTiming, TimingBreakdown};
}
