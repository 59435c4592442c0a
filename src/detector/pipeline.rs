//! Detector pipeline driving Haar cascade detection end-to-end.
//!
//! The [`HaarDetector`] owns a loaded cascade and its parameters: feed a
//! grayscale image and get merged detections, optionally with a trace of
//! what each step did.
//!
//! Typical usage:
//! ```no_run
//! use haar_detector::{Cascade, DetectorParams, HaarDetector};
//! use haar_detector::image::ImageU8;
//! use std::path::Path;
//!
//! # fn example(gray: ImageU8) -> Result<(), Box<dyn std::error::Error>> {
//! let cascade = Cascade::load(Path::new("face.txt"))?;
//! let detector = HaarDetector::new(cascade, DetectorParams::default());
//! for det in detector.process(gray)? {
//!     println!("{} {} {}x{} ({} hits)", det.x, det.y, det.width, det.height, det.hits);
//! }
//! # Ok(())
//! # }
//! ```
use super::error::DetectError;
use super::params::{DetectorParams, ScanMode};
use super::scan::{scan_single_size, scan_with_abort, Deadline, NeverAbort, ScanAbort, ScanOutput};
use crate::cascade::Cascade;
use crate::cluster::merge_detections;
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{DetectionReport, DetectionTrace, InputDescriptor, TimingBreakdown};
use crate::image::ImageU8;
use crate::integral::IntegralImage;
use crate::types::Detection;
use log::debug;
use std::time::{Duration, Instant};

/// Boosted cascade detector: integral image, scan, merge.
#[derive(Clone, Debug)]
pub struct HaarDetector {
    cascade: Cascade,
    params: DetectorParams,
}

impl HaarDetector {
    pub fn new(cascade: Cascade, params: DetectorParams) -> Self {
        Self { cascade, params }
    }

    pub fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn set_params(&mut self, params: DetectorParams) {
        self.params = params;
    }

    /// Detect objects in `gray`.
    pub fn process(&self, gray: ImageU8) -> Result<Vec<Detection>, DetectError> {
        self.process_with_diagnostics(gray).map(|r| r.detections)
    }

    /// Detect objects in `gray` and report timings and per-scale statistics.
    pub fn process_with_diagnostics(&self, gray: ImageU8) -> Result<DetectionReport, DetectError> {
        self.params.validate().map_err(DetectError::InvalidParams)?;
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();
        let integral = timings.measure("integral", || IntegralImage::build(gray))?;
        let mut report = self.run(&integral, timings)?;
        report.trace.timings.total_ms = elapsed_ms(total_start);
        Ok(report)
    }

    /// Run scan and merge on a prebuilt integral image.
    pub fn detect_integral(&self, integral: &IntegralImage) -> Result<Vec<Detection>, DetectError> {
        self.params.validate().map_err(DetectError::InvalidParams)?;
        self.run(integral, TimingBreakdown::default())
            .map(|r| r.detections)
    }

    fn run(
        &self,
        integral: &IntegralImage,
        mut timings: TimingBreakdown,
    ) -> Result<DetectionReport, DetectError> {
        let scan_start = Instant::now();
        let output = match self.params.time_budget_ms {
            Some(ms) => {
                let deadline = Deadline::after(Duration::from_secs_f64(ms / 1000.0));
                self.scan(integral, &deadline)?
            }
            None => self.scan(integral, &NeverAbort)?,
        };
        timings.push("scan", elapsed_ms(scan_start));

        let ScanOutput {
            roi,
            mut detections,
            scales,
            status,
        } = output;
        let raw_count = detections.len();
        if let Some(merge) = &self.params.merge {
            timings.measure("merge", || merge_detections(&mut detections, merge))?;
        }
        timings.total_ms = timings.stages.iter().map(|s| s.elapsed_ms).sum();
        debug!(
            "HaarDetector: raw={} merged={} status={:?}",
            raw_count,
            detections.len(),
            status
        );

        let window = self.cascade.orig_window_size();
        let trace = DetectionTrace {
            input: InputDescriptor {
                width: integral.width(),
                height: integral.height(),
                cascade_window: [window.width, window.height],
                cascade_stages: self.cascade.stage_count(),
            },
            roi,
            timings,
            status,
            raw_count,
            merged_count: detections.len(),
            scales,
        };
        Ok(DetectionReport { detections, trace })
    }

    fn scan<A: ScanAbort>(
        &self,
        integral: &IntegralImage,
        abort: &A,
    ) -> Result<ScanOutput, DetectError> {
        match self.params.mode {
            ScanMode::MultiScale => scan_with_abort(
                &self.cascade,
                integral,
                self.params.roi,
                &self.params.scan,
                abort,
            ),
            ScanMode::SingleSize { window } => scan_single_size(
                &self.cascade,
                integral,
                self.params.roi,
                window,
                &self.params.scan,
                abort,
            ),
        }
    }
}
