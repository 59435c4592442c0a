use super::{ScaleReport, TimingBreakdown};
use crate::detector::ScanStatus;
use crate::types::{Detection, Rect};
use serde::Serialize;

/// Result produced by
/// [`HaarDetector::process_with_diagnostics`](crate::HaarDetector::process_with_diagnostics).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub detections: Vec<Detection>,
    pub trace: DetectionTrace,
}

/// What the detector did to produce `DetectionReport::detections`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionTrace {
    pub input: InputDescriptor,
    /// ROI after clamping to the image.
    pub roi: Rect,
    pub timings: TimingBreakdown,
    pub status: ScanStatus,
    pub raw_count: usize,
    pub merged_count: usize,
    pub scales: Vec<ScaleReport>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
    pub cascade_window: [i32; 2],
    pub cascade_stages: usize,
}
