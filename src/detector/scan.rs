//! Multi-scale sliding-window scan.
//!
//! Design
//! - The scale list is fixed up front: factors `1, s, s², …` while the scaled
//!   base window still fits the ROI minus a margin on both axes.
//! - Each scale binds its own [`ScaledCascade`]; the cascade itself is only
//!   borrowed, which is what lets the `parallel` feature scan scales on
//!   separate threads.
//! - Rows advance by `max(factor, 2)`. Columns advance by the same step,
//!   plus one pixel after a window with no decision, which skips faster over
//!   flat regions.
//! - Abort is polled before every window; whatever was found up to that
//!   point is returned.
use super::error::DetectError;
use super::evaluate::WindowOutcome;
use super::params::ScanParams;
use super::scaling::ScaledCascade;
use crate::cascade::Cascade;
use crate::diagnostics::ScaleReport;
use crate::integral::IntegralImage;
use crate::types::{Detection, Rect, WindowSize};
use log::debug;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Cooperative cancellation polled between window positions.
pub trait ScanAbort: Sync {
    fn should_abort(&self) -> bool;
}

impl<F> ScanAbort for F
where
    F: Fn() -> bool + Sync,
{
    fn should_abort(&self) -> bool {
        self()
    }
}

/// Never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverAbort;

impl ScanAbort for NeverAbort {
    #[inline]
    fn should_abort(&self) -> bool {
        false
    }
}

/// Cancels once a wall-clock instant has passed.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }
}

impl ScanAbort for Deadline {
    #[inline]
    fn should_abort(&self) -> bool {
        Instant::now() >= self.at
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ScanStatus {
    Completed,
    /// Cancelled while scanning the `scale_index`-th scanned scale.
    #[serde(rename_all = "camelCase")]
    Aborted { scale_index: usize },
}

/// Raw hits of one scan plus per-scale statistics.
#[derive(Clone, Debug)]
pub struct ScanOutput {
    pub roi: Rect,
    pub detections: Vec<Detection>,
    pub scales: Vec<ScaleReport>,
    pub status: ScanStatus,
}

impl ScanOutput {
    pub fn is_complete(&self) -> bool {
        self.status == ScanStatus::Completed
    }
}

/// Scan every scale of `cascade` over `roi` (full image when `None`).
pub fn scan(
    cascade: &Cascade,
    integral: &IntegralImage,
    roi: Option<Rect>,
    params: &ScanParams,
) -> Result<ScanOutput, DetectError> {
    scan_with_abort(cascade, integral, roi, params, &NeverAbort)
}

pub fn scan_with_abort<A: ScanAbort + ?Sized>(
    cascade: &Cascade,
    integral: &IntegralImage,
    roi: Option<Rect>,
    params: &ScanParams,
    abort: &A,
) -> Result<ScanOutput, DetectError> {
    check_inputs(integral, params)?;
    let roi = clamp_roi(roi, integral);
    let factors = plan_scales(cascade.orig_window_size(), roi, params);
    debug!(
        "scan roi={:?} scales={} step={}",
        roi,
        factors.len(),
        params.scale_step
    );
    Ok(run_scales(cascade, integral, roi, &factors, params, abort))
}

/// Scan a single window size: the one scale whose base window best covers
/// `window` (largest of the two axis ratios).
///
/// The factor is real-valued, so a 95×60 request on a 40×25 cascade scans
/// at 2.4 with 96×60 windows. Scanners that take the integer width ratio
/// would use factor 2 and 80×50 windows for the same request.
pub fn scan_single_size<A: ScanAbort + ?Sized>(
    cascade: &Cascade,
    integral: &IntegralImage,
    roi: Option<Rect>,
    window: WindowSize,
    params: &ScanParams,
    abort: &A,
) -> Result<ScanOutput, DetectError> {
    check_inputs(integral, params)?;
    if window.width <= 0 || window.height <= 0 {
        return Err(DetectError::InvalidParams(format!(
            "single-size window must be positive, got {}x{}",
            window.width, window.height
        )));
    }
    let roi = clamp_roi(roi, integral);
    let orig = cascade.orig_window_size();
    let factor = (window.width as f64 / orig.width as f64)
        .max(window.height as f64 / orig.height as f64);
    debug!(
        "single-size scan roi={:?} window={}x{} factor={:.3}",
        roi, window.width, window.height, factor
    );
    Ok(run_scales(cascade, integral, roi, &[factor], params, abort))
}

fn check_inputs(integral: &IntegralImage, params: &ScanParams) -> Result<(), DetectError> {
    params.validate().map_err(DetectError::InvalidParams)?;
    if !integral.has_squares() {
        return Err(DetectError::MissingSquares);
    }
    Ok(())
}

fn clamp_roi(roi: Option<Rect>, integral: &IntegralImage) -> Rect {
    let full = Rect::new(0, 0, integral.width() as i32, integral.height() as i32);
    roi.unwrap_or(full)
        .clamp_to(integral.width(), integral.height())
}

/// Scale factors actually scanned, after the min/max window filters.
fn plan_scales(orig: WindowSize, roi: Rect, params: &ScanParams) -> Vec<f64> {
    let limit_w = (roi.width - params.roi_margin) as f64;
    let limit_h = (roi.height - params.roi_margin) as f64;
    let mut factors = Vec::new();
    let mut factor = 1.0f64;
    while (orig.width as f64) * factor < limit_w && (orig.height as f64) * factor < limit_h {
        let win = orig.scaled(factor);
        if let Some(max) = params.max_size {
            if win.width > max.width || win.height > max.height {
                break;
            }
        }
        if win.width >= params.min_size.width && win.height >= params.min_size.height {
            factors.push(factor);
        }
        factor *= params.scale_step;
    }
    factors
}

/// Outcome of scanning one scale.
struct ScaleScan {
    detections: Vec<Detection>,
    report: ScaleReport,
    aborted: bool,
}

fn run_scales<A: ScanAbort + ?Sized>(
    cascade: &Cascade,
    integral: &IntegralImage,
    roi: Rect,
    factors: &[f64],
    params: &ScanParams,
    abort: &A,
) -> ScanOutput {
    #[cfg(feature = "parallel")]
    let per_scale: Vec<ScaleScan> = {
        use rayon::prelude::*;
        factors
            .par_iter()
            .map(|&f| scan_scale(cascade, integral, roi, f, params, abort))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let per_scale: Vec<ScaleScan> = {
        let mut out = Vec::with_capacity(factors.len());
        for &f in factors {
            let scale = scan_scale(cascade, integral, roi, f, params, abort);
            let aborted = scale.aborted;
            out.push(scale);
            if aborted {
                break;
            }
        }
        out
    };

    let mut output = ScanOutput {
        roi,
        detections: Vec::new(),
        scales: Vec::with_capacity(per_scale.len()),
        status: ScanStatus::Completed,
    };
    for (scale_index, scale) in per_scale.into_iter().enumerate() {
        output.detections.extend(scale.detections);
        output.scales.push(scale.report);
        if scale.aborted {
            output.status = ScanStatus::Aborted { scale_index };
            break;
        }
    }
    debug!(
        "scan done: scales={} hits={} status={:?}",
        output.scales.len(),
        output.detections.len(),
        output.status
    );
    output
}

fn scan_scale<A: ScanAbort + ?Sized>(
    cascade: &Cascade,
    integral: &IntegralImage,
    roi: Rect,
    factor: f64,
    params: &ScanParams,
    abort: &A,
) -> ScaleScan {
    let bound = ScaledCascade::bind(cascade, integral, factor);
    let win = bound.real_window_size();
    let step = factor.max(2.0) as i32;
    let mut report = ScaleReport::new(factor, win, step, cascade.stage_count());
    let mut detections = Vec::new();

    let x_end = roi.x + roi.width - win.width;
    let y_end = roi.y + roi.height - win.height;
    let mut y = roi.y;
    while y < y_end {
        let mut x = roi.x;
        while x < x_end {
            if abort.should_abort() {
                return ScaleScan {
                    detections,
                    report,
                    aborted: true,
                };
            }
            let outcome = bound.evaluate(integral, x, y, params.min_std);
            report.record(outcome);
            let widen = match outcome {
                WindowOutcome::Accepted => {
                    detections.push(Detection::new(x, y, win.width, win.height));
                    false
                }
                WindowOutcome::Indeterminate => true,
                WindowOutcome::Rejected(0) => params.widen_on_first_stage_reject,
                WindowOutcome::Rejected(_) => false,
            };
            x += if widen { step + 1 } else { step };
        }
        y += step;
    }

    ScaleScan {
        detections,
        report,
        aborted: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{HaarFeature, Stage, WeakClassifier, WeightedRect};
    use crate::image::ImageU8;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn edge_cascade() -> Cascade {
        let feature = HaarFeature::two(
            WeightedRect::new(0, 0, 20, 20, -1.0),
            WeightedRect::new(10, 0, 10, 20, 2.0),
        );
        Cascade::new(
            WindowSize::new(20, 20),
            vec![Stage::new(
                vec![WeakClassifier::new(feature, 0.5, -1.0, 1.0)],
                0.0,
            )],
        )
    }

    fn flat_integral(w: usize, h: usize, value: u8) -> IntegralImage {
        let data = vec![value; w * h];
        IntegralImage::build(ImageU8::new(w, h, &data).unwrap()).unwrap()
    }

    #[test]
    fn single_size_factor_is_real_valued() {
        let feature = HaarFeature::two(
            WeightedRect::new(0, 0, 40, 25, -1.0),
            WeightedRect::new(20, 0, 20, 25, 2.0),
        );
        let cascade = Cascade::new(
            WindowSize::new(40, 25),
            vec![Stage::new(
                vec![WeakClassifier::new(feature, 0.5, -1.0, 1.0)],
                0.0,
            )],
        );
        let integral = flat_integral(200, 120, 50);
        let out = scan_single_size(
            &cascade,
            &integral,
            None,
            WindowSize::new(95, 60),
            &ScanParams::default(),
            &NeverAbort,
        )
        .unwrap();
        assert_eq!(out.scales.len(), 1);
        assert!((out.scales[0].scale - 2.4).abs() < 1e-12);
        assert_eq!(out.scales[0].window, WindowSize::new(96, 60));
    }

    #[test]
    fn scale_plan_respects_margin_and_limits() {
        let orig = WindowSize::new(20, 20);
        let roi = Rect::new(0, 0, 100, 60);
        let params = ScanParams {
            scale_step: 1.5,
            ..Default::default()
        };
        // 20, 30, 45 fit below 55; 67.5 does not.
        let factors = plan_scales(orig, roi, &params);
        assert_eq!(factors, vec![1.0, 1.5, 2.25]);

        let params = ScanParams {
            scale_step: 1.5,
            min_size: WindowSize::new(25, 25),
            max_size: Some(WindowSize::new(40, 40)),
            ..Default::default()
        };
        assert_eq!(plan_scales(orig, roi, &params), vec![1.5]);
    }

    #[test]
    fn uniform_image_is_all_indeterminate() {
        let integral = flat_integral(64, 48, 128);
        let out = scan(&edge_cascade(), &integral, None, &ScanParams::default()).unwrap();
        assert!(out.is_complete());
        assert!(out.detections.is_empty());
        assert!(!out.scales.is_empty());
        for s in &out.scales {
            assert!(s.windows > 0, "scale {:.3} visited no windows", s.scale);
            assert_eq!(s.indeterminate, s.windows);
            assert_eq!(s.accepted, 0);
        }
    }

    #[test]
    fn indeterminate_windows_widen_the_column_step() {
        let integral = flat_integral(64, 48, 0);
        let params = ScanParams::default();
        let out = scan_single_size(
            &edge_cascade(),
            &integral,
            Some(Rect::new(0, 0, 40, 22)),
            WindowSize::new(20, 20),
            &params,
            &NeverAbort,
        )
        .unwrap();
        // x in {0, 3, 6, ..., 18} on rows y in {0}: step 2 widened to 3.
        assert_eq!(out.scales.len(), 1);
        assert_eq!(out.scales[0].step, 2);
        assert_eq!(out.scales[0].windows, 7);
    }

    #[test]
    fn roi_is_clamped_to_image() {
        let integral = flat_integral(50, 40, 10);
        let out = scan(
            &edge_cascade(),
            &integral,
            Some(Rect::new(-10, 30, 200, 200)),
            &ScanParams::default(),
        )
        .unwrap();
        assert_eq!(out.roi, Rect::new(0, 30, 50, 10));
        assert!(out.scales.is_empty());
    }

    #[test]
    fn immediate_abort_returns_nothing() {
        let integral = flat_integral(64, 48, 0);
        let abort = || true;
        let out = scan_with_abort(
            &edge_cascade(),
            &integral,
            None,
            &ScanParams::default(),
            &abort,
        )
        .unwrap();
        assert_eq!(out.status, ScanStatus::Aborted { scale_index: 0 });
        assert!(out.detections.is_empty());
    }

    #[test]
    fn abort_is_polled_per_window() {
        let integral = flat_integral(64, 48, 0);
        let polls = AtomicUsize::new(0);
        let abort = || polls.fetch_add(1, Ordering::Relaxed) >= 5;
        let out = scan_single_size(
            &edge_cascade(),
            &integral,
            None,
            WindowSize::new(20, 20),
            &ScanParams::default(),
            &abort,
        )
        .unwrap();
        assert_eq!(out.status, ScanStatus::Aborted { scale_index: 0 });
        assert_eq!(out.scales[0].windows, 5);
    }

    #[test]
    fn missing_squares_and_bad_params_fail() {
        let data = vec![0u8; 30 * 30];
        let integral = IntegralImage::build_sum_only(ImageU8::new(30, 30, &data).unwrap()).unwrap();
        assert!(matches!(
            scan(&edge_cascade(), &integral, None, &ScanParams::default()),
            Err(DetectError::MissingSquares)
        ));
        let integral = flat_integral(30, 30, 0);
        let params = ScanParams {
            scale_step: 0.9,
            ..Default::default()
        };
        assert!(matches!(
            scan(&edge_cascade(), &integral, None, &params),
            Err(DetectError::InvalidParams(_))
        ));
    }

    #[test]
    fn deadline_in_the_past_aborts() {
        assert!(Deadline::at(Instant::now()).should_abort());
        assert!(!Deadline::after(Duration::from_secs(3600)).should_abort());
        assert!(!NeverAbort.should_abort());
    }
}
