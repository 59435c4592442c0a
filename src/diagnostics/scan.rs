use crate::detector::WindowOutcome;
use crate::types::WindowSize;
use serde::{Deserialize, Serialize};

/// Window statistics for one scanned scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleReport {
    pub scale: f64,
    pub window: WindowSize,
    /// Row step; the column step is this or one more.
    pub step: i32,
    pub windows: usize,
    pub accepted: usize,
    pub indeterminate: usize,
    /// `rejections[i]` counts windows rejected by stage `i`.
    pub rejections: Vec<usize>,
}

impl ScaleReport {
    pub fn new(scale: f64, window: WindowSize, step: i32, stages: usize) -> Self {
        Self {
            scale,
            window,
            step,
            windows: 0,
            accepted: 0,
            indeterminate: 0,
            rejections: vec![0; stages],
        }
    }

    pub fn record(&mut self, outcome: WindowOutcome) {
        self.windows += 1;
        match outcome {
            WindowOutcome::Accepted => self.accepted += 1,
            WindowOutcome::Indeterminate => self.indeterminate += 1,
            WindowOutcome::Rejected(stage) => {
                if let Some(count) = self.rejections.get_mut(stage) {
                    *count += 1;
                }
            }
        }
    }

    /// Windows that reached a decision and were rejected.
    pub fn rejected(&self) -> usize {
        self.rejections.iter().sum()
    }
}
