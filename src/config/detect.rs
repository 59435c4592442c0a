use crate::bundle::BundleParams;
use crate::detector::DetectorParams;
use crate::types::Rect;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Run configuration for the `haar_detect` tool.
///
/// Exactly one of `cascade` (text or `.json` table) and `bundle` must be set.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectToolConfig {
    pub input: PathBuf,
    #[serde(default)]
    pub cascade: Option<PathBuf>,
    #[serde(default)]
    pub bundle: Option<PathBuf>,
    /// Overrides `detector.roi` when present.
    #[serde(default)]
    pub roi: Option<Rect>,
    #[serde(default)]
    pub detector: DetectorParams,
    #[serde(default)]
    pub bundle_params: BundleParams,
    pub output: DetectOutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct DetectOutputConfig {
    pub json: PathBuf,
    /// Optional copy of the input with detections outlined.
    #[serde(default)]
    pub overlay: Option<PathBuf>,
}

/// Which detector the config selects.
pub enum DetectorSource<'a> {
    Cascade(&'a Path),
    Bundle(&'a Path),
}

impl DetectToolConfig {
    pub fn source(&self) -> Result<DetectorSource<'_>, String> {
        match (&self.cascade, &self.bundle) {
            (Some(c), None) => Ok(DetectorSource::Cascade(c)),
            (None, Some(b)) => Ok(DetectorSource::Bundle(b)),
            (Some(_), Some(_)) => Err("config sets both `cascade` and `bundle`".to_string()),
            (None, None) => Err("config needs one of `cascade` or `bundle`".to_string()),
        }
    }

    /// Detector parameters with the top-level ROI applied.
    pub fn detector_params(&self) -> DetectorParams {
        let mut params = self.detector.clone();
        if self.roi.is_some() {
            params.roi = self.roi;
        }
        params
    }
}

pub fn load_config(path: &Path) -> Result<DetectToolConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: DetectToolConfig = serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    config
        .detector_params()
        .validate()
        .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
    config
        .source()
        .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
    Ok(config)
}
