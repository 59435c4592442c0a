//! Parameter types configuring the scan, the merge and the detector pipeline.
//!
//! All structs deserialize with `#[serde(default)]` so JSON configs only need
//! the knobs they change. Defaults follow the values used by the camera
//! firmware: 10% scale growth, a 5 px ROI margin and a minimum window
//! standard deviation of 10 grey levels.
use crate::types::{Rect, WindowSize};
use serde::{Deserialize, Serialize};

/// Sliding-window scan configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanParams {
    /// Multiplicative growth between consecutive scales (> 1).
    pub scale_step: f64,
    /// Scales whose window is smaller than this in either dimension are skipped.
    pub min_size: WindowSize,
    /// The scan stops at the first scale whose window exceeds this in either
    /// dimension. `None` scans up to the ROI size.
    pub max_size: Option<WindowSize>,
    /// Windows with a smaller pixel standard deviation are left undecided.
    pub min_std: f64,
    /// Pixels kept free between the largest window and the ROI border when
    /// counting scales.
    pub roi_margin: i32,
    /// Also widen the horizontal step after a first-stage rejection, not only
    /// after a low-variance window.
    pub widen_on_first_stage_reject: bool,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            scale_step: 1.1,
            min_size: WindowSize::new(0, 0),
            max_size: None,
            min_std: 10.0,
            roi_margin: 5,
            widen_on_first_stage_reject: false,
        }
    }
}

impl ScanParams {
    pub fn validate(&self) -> Result<(), String> {
        if !self.scale_step.is_finite() || self.scale_step <= 1.0 {
            return Err(format!(
                "scale_step must be finite and > 1, got {}",
                self.scale_step
            ));
        }
        if !self.min_std.is_finite() || self.min_std < 0.0 {
            return Err(format!("min_std must be >= 0, got {}", self.min_std));
        }
        if self.roi_margin < 0 {
            return Err(format!("roi_margin must be >= 0, got {}", self.roi_margin));
        }
        if let Some(max) = self.max_size {
            if max.width < self.min_size.width || max.height < self.min_size.height {
                return Err(format!(
                    "max_size {}x{} is smaller than min_size {}x{}",
                    max.width, max.height, self.min_size.width, self.min_size.height
                ));
            }
        }
        Ok(())
    }
}

/// Greedy overlap merge configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeParams {
    /// Two boxes merge when `overlap * distance_factor > min(area)`; must be >= 1.
    pub distance_factor: f64,
    /// A cluster survives only if it represents more than this many raw hits.
    pub min_hits: u32,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            distance_factor: 2.0,
            min_hits: 2,
        }
    }
}

impl MergeParams {
    pub fn validate(&self) -> Result<(), String> {
        if !self.distance_factor.is_finite() || self.distance_factor < 1.0 {
            return Err(format!(
                "distance_factor must be finite and >= 1, got {}",
                self.distance_factor
            ));
        }
        Ok(())
    }
}

/// How the detector walks the image.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScanMode {
    /// Full scale pyramid bounded by `ScanParams::{min_size, max_size}`.
    #[default]
    MultiScale,
    /// One window size only, for targets of known size.
    SingleSize { window: WindowSize },
}

/// Parameters for [`HaarDetector`](crate::detector::HaarDetector).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectorParams {
    /// Region to scan; `None` scans the full image. Clamped to the image.
    pub roi: Option<Rect>,
    pub mode: ScanMode,
    pub scan: ScanParams,
    /// `None` returns the raw scan hits unmerged.
    pub merge: Option<MergeParams>,
    /// Wall-clock budget for the scan; on expiry the hits found so far are kept.
    pub time_budget_ms: Option<f64>,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            roi: None,
            mode: ScanMode::default(),
            scan: ScanParams::default(),
            merge: Some(MergeParams::default()),
            time_budget_ms: None,
        }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<(), String> {
        self.scan.validate()?;
        if let Some(merge) = &self.merge {
            merge.validate()?;
        }
        if let ScanMode::SingleSize { window } = self.mode {
            if window.width <= 0 || window.height <= 0 {
                return Err(format!(
                    "single-size window must be positive, got {}x{}",
                    window.width, window.height
                ));
            }
        }
        if let Some(ms) = self.time_budget_ms {
            if !ms.is_finite() || ms < 0.0 {
                return Err(format!("time_budget_ms must be >= 0, got {ms}"));
            }
        }
        Ok(())
    }
}
