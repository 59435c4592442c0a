//! Frame-to-frame tracking of merged detections.
//!
//! Each tracker remembers the last box it was matched to. A detection whose
//! origin lies within half a tracker's size of that tracker's origin refreshes
//! it; a detection no tracker claims spawns a new one. Trackers missed in a
//! frame lose one life and are dropped at zero.
//!
//! Matching is greedy in detection order and a detection may refresh every
//! unclaimed tracker it is close to, not just the first.
use crate::types::{Detection, Rect};
use serde::Serialize;

/// Upper bound of [`Tracker::life`].
pub const MAX_LIFE: u8 = 3;
/// Upper bound of [`Tracker::check`].
pub const MAX_CHECK: u8 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracker {
    pub rect: Rect,
    /// Matched in the most recent frame.
    pub detected: bool,
    /// Frames the tracker survives without a match.
    pub life: u8,
    /// Matches so far, saturating at [`MAX_CHECK`].
    pub check: u8,
}

impl Tracker {
    fn spawn(rect: Rect) -> Self {
        Self {
            rect,
            detected: true,
            life: 1,
            check: 1,
        }
    }

    /// Seen in at least two frames.
    #[inline]
    pub fn is_stable(&self) -> bool {
        self.check > 1
    }

    fn claims(&self, rect: &Rect) -> bool {
        !self.detected
            && (self.rect.y - rect.y).abs() < self.rect.height / 2
            && (self.rect.x - rect.x).abs() < self.rect.width / 2
    }

    fn refresh(&mut self, rect: Rect) {
        self.rect = rect;
        self.detected = true;
        self.life = (self.life + 1).min(MAX_LIFE);
        self.check = (self.check + 1).min(MAX_CHECK);
    }
}

/// Update `trackers` with one frame of merged `detections`.
pub fn track_detections(detections: &[Detection], trackers: &mut Vec<Tracker>) {
    for t in trackers.iter_mut() {
        t.detected = false;
    }

    for d in detections {
        let rect = d.rect();
        let mut inherited = false;
        for t in trackers.iter_mut().filter(|t| t.claims(&rect)) {
            t.refresh(rect);
            inherited = true;
        }
        if !inherited {
            trackers.push(Tracker::spawn(rect));
        }
    }

    trackers.retain_mut(|t| {
        if !t.detected {
            t.life = t.life.saturating_sub(1);
        }
        t.life > 0
    });
}
