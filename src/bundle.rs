//! Composite detector description: several tagged cascades sharing one scan ROI.
//!
//! On disk a bundle is JSON:
//! ```json
//! { "id": "dock-markers",
//!   "scanRoi": { "x": 0, "y": 40, "width": 640, "height": 400 },
//!   "tags": [ { "kind": "mark", "rect": { "x": 0, "y": 0, "width": 40, "height": 25 },
//!               "table": [40, 25, 2, ...] } ] }
//! ```
//! Each tag's `table` is a flattened cascade and its `rect` gives the window
//! size the tag was trained at. An optional `scanBar` rect overrides the
//! default bar: 10 px wide, centred on tag 0, spanning the frame height.
//!
//! Running a bundle is one frame of a stream:
//! 1. one single-size scan per tag over the shared integral image, merged
//!    per tag;
//! 2. each tag's merged boxes feed that tag's [`Tracker`]s;
//! 3. a stable tag-0 tracker overlapping the scan bar marks the mark as
//!    *in the bar*; entering resets every tag's hit count, every frame in
//!    the bar counts tags with a stable, matched tracker, and leaving marks
//!    tags hit more than twice as checked.
use crate::cascade::{Cascade, CascadeError};
use crate::cluster::merge_detections;
use crate::detector::{scan_single_size, DetectError, MergeParams, NeverAbort, ScanParams, ScanStatus};
use crate::integral::IntegralImage;
use crate::tracking::{track_detections, Tracker};
use crate::types::{Detection, Rect, WindowSize};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to read bundle {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse bundle JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bundle {id:?} has no tags")]
    NoTags { id: String },
    #[error("tag {index} ({kind}) has a non-positive rect {width}x{height}")]
    InvalidTagRect {
        index: usize,
        kind: String,
        width: i32,
        height: i32,
    },
    #[error("tag {index} ({kind}): {source}")]
    Tag {
        index: usize,
        kind: String,
        #[source]
        source: CascadeError,
    },
}

/// Serialized form of one tag.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagRecord {
    kind: String,
    rect: Rect,
    table: Vec<f64>,
}

/// Serialized form of a bundle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleRecord {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scan_roi: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scan_bar: Option<Rect>,
    tags: Vec<TagRecord>,
}

/// One loaded tag.
#[derive(Clone, Debug, PartialEq)]
pub struct BundleTag {
    pub kind: String,
    pub rect: Rect,
    pub cascade: Cascade,
}

impl BundleTag {
    pub fn window(&self) -> WindowSize {
        WindowSize::new(self.rect.width, self.rect.height)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorBundle {
    pub id: String,
    pub scan_roi: Option<Rect>,
    pub scan_bar: Option<Rect>,
    pub tags: Vec<BundleTag>,
    state: BundleState,
}

/// Tracking and tally state of one tag, carried across frames.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagState {
    pub trackers: Vec<Tracker>,
    /// Frames in the bar with a stable, matched tracker.
    pub hit_count: u32,
    pub checked: bool,
}

/// Cross-frame state of a bundle.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleState {
    pub tags: Vec<TagState>,
    /// A stable tag-0 tracker overlaps the scan bar.
    pub in_bar: bool,
}

/// Scan-bar transition of tag 0 in one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BarEvent {
    Entered,
    Left,
}

/// Scan and merge settings applied to every tag of a bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleParams {
    pub scan: ScanParams,
    pub merge: MergeParams,
}

impl Default for BundleParams {
    fn default() -> Self {
        Self {
            scan: ScanParams::default(),
            merge: MergeParams {
                distance_factor: 2.0,
                min_hits: 2,
            },
        }
    }
}

/// Merged detections of one tag.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDetections {
    pub index: usize,
    pub kind: String,
    pub window: WindowSize,
    pub status: ScanStatus,
    pub raw_count: usize,
    pub detections: Vec<Detection>,
}

/// Output of one [`DetectorBundle::run`].
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleFrame {
    pub tags: Vec<TagDetections>,
    pub scan_bar: Rect,
    pub event: Option<BarEvent>,
    /// State after this frame.
    pub state: BundleState,
}

impl DetectorBundle {
    pub fn load(path: &Path) -> Result<Self, BundleError> {
        let json = fs::read_to_string(path).map_err(|source| BundleError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, BundleError> {
        let record: BundleRecord = serde_json::from_str(json)?;
        if record.tags.is_empty() {
            return Err(BundleError::NoTags { id: record.id });
        }
        let mut tags = Vec::with_capacity(record.tags.len());
        for (index, tag) in record.tags.into_iter().enumerate() {
            if tag.rect.width <= 0 || tag.rect.height <= 0 {
                return Err(BundleError::InvalidTagRect {
                    index,
                    kind: tag.kind,
                    width: tag.rect.width,
                    height: tag.rect.height,
                });
            }
            let cascade = match Cascade::from_table(&tag.table) {
                Ok(cascade) => cascade,
                Err(source) => {
                    return Err(BundleError::Tag {
                        index,
                        kind: tag.kind,
                        source,
                    })
                }
            };
            tags.push(BundleTag {
                kind: tag.kind,
                rect: tag.rect,
                cascade,
            });
        }
        debug!("bundle {:?}: loaded {} tags", record.id, tags.len());
        let state = BundleState {
            tags: vec![TagState::default(); tags.len()],
            in_bar: false,
        };
        Ok(Self {
            id: record.id,
            scan_roi: record.scan_roi,
            scan_bar: record.scan_bar,
            tags,
            state,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let record = BundleRecord {
            id: self.id.clone(),
            scan_roi: self.scan_roi,
            scan_bar: self.scan_bar,
            tags: self
                .tags
                .iter()
                .map(|t| TagRecord {
                    kind: t.kind.clone(),
                    rect: t.rect,
                    table: t.cascade.to_table(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&record)
    }

    pub fn state(&self) -> &BundleState {
        &self.state
    }

    /// Forget trackers, tallies and the bar state.
    pub fn reset_state(&mut self) {
        self.state = BundleState {
            tags: vec![TagState::default(); self.tags.len()],
            in_bar: false,
        };
    }

    /// Bar used for a frame `frame_height` pixels tall.
    pub fn scan_bar_for(&self, frame_height: usize) -> Rect {
        self.scan_bar.unwrap_or_else(|| {
            let tag0 = self.tags.first().map_or(Rect::default(), |t| t.rect);
            Rect::new(tag0.x + tag0.width / 2 - 5, 0, 10, frame_height as i32)
        })
    }

    /// Process one frame: scan and merge every tag, then update trackers and
    /// the scan-bar tally.
    pub fn run(
        &mut self,
        integral: &IntegralImage,
        params: &BundleParams,
    ) -> Result<BundleFrame, DetectError> {
        let tags = self.detect_tags(integral, params)?;
        let scan_bar = self.scan_bar_for(integral.height());
        let event = self.state.update(&tags, scan_bar);
        if let Some(event) = event {
            debug!("bundle {:?}: mark {:?} the scan bar", self.id, event);
        }
        Ok(BundleFrame {
            tags,
            scan_bar,
            event,
            state: self.state.clone(),
        })
    }

    /// Scan every tag over the bundle ROI and merge each tag's hits. No
    /// state is touched.
    pub fn detect_tags(
        &self,
        integral: &IntegralImage,
        params: &BundleParams,
    ) -> Result<Vec<TagDetections>, DetectError> {
        params.merge.validate().map_err(DetectError::InvalidParams)?;
        let run_tag = |(index, tag): (usize, &BundleTag)| -> Result<TagDetections, DetectError> {
            let output = scan_single_size(
                &tag.cascade,
                integral,
                self.scan_roi,
                tag.window(),
                &params.scan,
                &NeverAbort,
            )?;
            let raw_count = output.detections.len();
            let mut detections = output.detections;
            merge_detections(&mut detections, &params.merge)?;
            Ok(TagDetections {
                index,
                kind: tag.kind.clone(),
                window: tag.window(),
                status: output.status,
                raw_count,
                detections,
            })
        };

        #[cfg(feature = "parallel")]
        let results: Result<Vec<_>, _> = {
            use rayon::prelude::*;
            self.tags.par_iter().enumerate().map(run_tag).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let results: Result<Vec<_>, _> = self.tags.iter().enumerate().map(run_tag).collect();

        let results = results?;
        debug!(
            "bundle {:?}: {} detections over {} tags",
            self.id,
            results.iter().map(|t| t.detections.len()).sum::<usize>(),
            results.len()
        );
        Ok(results)
    }
}

impl BundleState {
    /// Fold one frame of merged tag detections into the state.
    pub fn update(&mut self, frame: &[TagDetections], scan_bar: Rect) -> Option<BarEvent> {
        if self.tags.len() < frame.len() {
            self.tags.resize_with(frame.len(), TagState::default);
        }
        for (state, tag) in self.tags.iter_mut().zip(frame) {
            track_detections(&tag.detections, &mut state.trackers);
        }

        let in_bar = self.tags.first().is_some_and(|tag0| {
            tag0.trackers
                .iter()
                .any(|t| t.is_stable() && overlaps_bar(&t.rect, &scan_bar))
        });
        let event = match (self.in_bar, in_bar) {
            (false, true) => Some(BarEvent::Entered),
            (true, false) => Some(BarEvent::Left),
            _ => None,
        };
        self.in_bar = in_bar;

        if event == Some(BarEvent::Entered) {
            for tag in &mut self.tags {
                tag.checked = false;
                tag.hit_count = 0;
            }
        }
        if self.in_bar {
            for tag in &mut self.tags {
                if tag.trackers.iter().any(|t| t.is_stable() && t.detected) {
                    tag.hit_count += 1;
                }
            }
        }
        if event == Some(BarEvent::Left) {
            for tag in &mut self.tags {
                if tag.hit_count > 2 {
                    tag.checked = true;
                }
            }
        }
        event
    }
}

/// Centre distance below half the summed extents on both axes.
fn overlaps_bar(r: &Rect, bar: &Rect) -> bool {
    let dy = (r.y + r.height / 2 - bar.y - bar.height / 2).abs();
    let dx = (r.x + r.width / 2 - bar.x - bar.width / 2).abs();
    dy < (r.height + bar.height) / 2 && dx < (r.width + bar.width) / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageU8;

    const EDGE_TABLE: &str = "[20, 20, 1, 1, 1, 2, 0, 0, 20, 20, -1, 10, 0, 10, 20, 2, 0, 0.5, -1, 1, 0, -1, -1]";

    fn bundle_json(tables: &[&str]) -> String {
        let tags: Vec<String> = tables
            .iter()
            .map(|t| {
                format!(
                    r#"{{ "kind": "edge", "rect": {{ "x": 0, "y": 0, "width": 20, "height": 20 }}, "table": {t} }}"#
                )
            })
            .collect();
        format!(
            r#"{{ "id": "test", "scanRoi": {{ "x": 0, "y": 0, "width": 60, "height": 30 }}, "tags": [{}] }}"#,
            tags.join(", ")
        )
    }

    #[test]
    fn loads_and_round_trips() {
        let bundle = DetectorBundle::from_json(&bundle_json(&[EDGE_TABLE])).expect("load");
        assert_eq!(bundle.tags.len(), 1);
        assert_eq!(bundle.tags[0].window(), WindowSize::new(20, 20));
        assert_eq!(bundle.scan_roi, Some(Rect::new(0, 0, 60, 30)));
        let again = DetectorBundle::from_json(&bundle.to_json().unwrap()).expect("reload");
        assert_eq!(again, bundle);
    }

    #[test]
    fn bad_tag_reports_its_index() {
        let err = DetectorBundle::from_json(&bundle_json(&[EDGE_TABLE, "[20, 20, 1]"]))
            .unwrap_err();
        assert!(
            matches!(
                err,
                BundleError::Tag {
                    index: 1,
                    source: CascadeError::UnexpectedEnd { .. },
                    ..
                }
            ),
            "unexpected error: {err}"
        );
        assert!(matches!(
            DetectorBundle::from_json(r#"{ "id": "empty", "tags": [] }"#),
            Err(BundleError::NoTags { .. })
        ));
    }

    #[test]
    fn run_merges_per_tag() {
        let mut bundle =
            DetectorBundle::from_json(&bundle_json(&[EDGE_TABLE, EDGE_TABLE])).expect("load");
        let (w, h) = (80usize, 40usize);
        let data: Vec<u8> = (0..w * h)
            .map(|i| if i % w >= 30 { 220 } else { 30 })
            .collect();
        let integral = IntegralImage::build(ImageU8::new(w, h, &data).unwrap()).unwrap();
        let frame = bundle.run(&integral, &BundleParams::default()).expect("run");
        let results = &frame.tags;
        assert_eq!(results.len(), 2);
        for tag in results {
            assert_eq!(tag.status, ScanStatus::Completed);
            assert!(tag.raw_count > 0, "tag {} found nothing", tag.index);
            assert!(!tag.detections.is_empty());
            assert!(tag.detections.len() < tag.raw_count);
            for d in &tag.detections {
                assert!(d.hits > 2, "thin cluster survived: {d:?}");
                assert!(d.x + d.width <= 60 && d.y + d.height <= 30);
                assert!(d.x < 30 && d.x + d.width > 30, "merged box misses the edge: {d:?}");
            }
        }
        assert_eq!(results[0].detections, results[1].detections);

        // Default bar: 10 px centred on tag 0, full frame height.
        assert_eq!(frame.scan_bar, Rect::new(5, 0, 10, 40));
        assert_eq!(frame.event, None);
        assert!(frame.state.tags[0]
            .trackers
            .iter()
            .all(|t| t.detected && !t.is_stable()));

        let second = bundle.run(&integral, &BundleParams::default()).expect("run");
        assert!(second.state.tags[0].trackers.iter().any(|t| t.is_stable()));
        assert_eq!(bundle.state(), &second.state);
        bundle.reset_state();
        assert!(bundle.state().tags.iter().all(|t| t.trackers.is_empty()));
    }

    fn tag_frame(index: usize, detections: Vec<Detection>) -> TagDetections {
        TagDetections {
            index,
            kind: "mark".to_string(),
            window: WindowSize::new(20, 20),
            status: ScanStatus::Completed,
            raw_count: detections.len(),
            detections,
        }
    }

    #[test]
    fn scan_bar_tally_checks_tags_seen_long_enough() {
        let bar = Rect::new(45, 0, 10, 100);
        let mark = Detection::new(40, 10, 20, 20);
        let other = Detection::new(100, 10, 20, 20);
        let mut state = BundleState::default();

        // Tag 0 in the first four frames, tag 1 in the first three.
        let mut events = Vec::new();
        for frame in 0..7 {
            let tag0 = if frame < 4 { vec![mark] } else { vec![] };
            let tag1 = if frame < 3 { vec![other] } else { vec![] };
            events.push(state.update(&[tag_frame(0, tag0), tag_frame(1, tag1)], bar));
            if frame == 1 {
                assert!(state.in_bar);
            }
        }

        assert_eq!(
            events,
            vec![
                None,
                Some(BarEvent::Entered),
                None,
                None,
                None,
                None,
                Some(BarEvent::Left)
            ]
        );
        assert!(!state.in_bar);
        assert_eq!(state.tags[0].hit_count, 3);
        assert!(state.tags[0].checked);
        assert_eq!(state.tags[1].hit_count, 2);
        assert!(!state.tags[1].checked);
    }

    #[test]
    fn scan_bar_override_round_trips() {
        let json = bundle_json(&[EDGE_TABLE]).replacen(
            r#""tags""#,
            r#""scanBar": { "x": 1, "y": 2, "width": 3, "height": 4 }, "tags""#,
            1,
        );
        let bundle = DetectorBundle::from_json(&json).expect("load");
        assert_eq!(bundle.scan_bar_for(480), Rect::new(1, 2, 3, 4));
        let again = DetectorBundle::from_json(&bundle.to_json().unwrap()).expect("reload");
        assert_eq!(again.scan_bar, bundle.scan_bar);
    }
}
