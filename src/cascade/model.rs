//! In-memory description of a trained boosted cascade.
//!
//! The model is immutable once loaded. Everything that depends on the scan
//! scale (scaled rectangles, corner offsets, rescaled weights) lives in
//! [`ScaledCascade`](crate::detector::ScaledCascade) instead, so one
//! `Cascade` can back any number of concurrent scans.
use crate::types::{Rect, WindowSize};

/// Maximum number of rectangles per Haar feature.
pub const MAX_FEATURE_RECTS: usize = 3;

/// Rectangle in the feature's local frame with its trained weight.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WeightedRect {
    pub rect: Rect,
    pub weight: f32,
}

impl WeightedRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32, weight: f32) -> Self {
        Self {
            rect: Rect::new(x, y, width, height),
            weight,
        }
    }
}

/// Signed combination of two or three rectangle sums.
///
/// Rect 0 is the primary rectangle; its weight is recomputed at every scale
/// so that the feature stays zero-sum over its support.
#[derive(Clone, Debug, PartialEq)]
pub struct HaarFeature {
    rects: [WeightedRect; MAX_FEATURE_RECTS],
    count: usize,
    pub tilted: bool,
}

impl HaarFeature {
    pub fn two(r0: WeightedRect, r1: WeightedRect) -> Self {
        Self {
            rects: [r0, r1, WeightedRect::default()],
            count: 2,
            tilted: false,
        }
    }

    pub fn three(r0: WeightedRect, r1: WeightedRect, r2: WeightedRect) -> Self {
        Self {
            rects: [r0, r1, r2],
            count: 3,
            tilted: false,
        }
    }

    pub fn with_tilted(mut self, tilted: bool) -> Self {
        self.tilted = tilted;
        self
    }

    #[inline]
    pub fn rects(&self) -> &[WeightedRect] {
        &self.rects[..self.count]
    }

    #[inline]
    pub fn is_two_rect(&self) -> bool {
        self.count == 2
    }
}

/// Single-node decision stump over one Haar feature.
#[derive(Clone, Debug, PartialEq)]
pub struct WeakClassifier {
    pub feature: HaarFeature,
    pub threshold: f32,
    /// Output when the normalized response is below `threshold`.
    pub left: f32,
    /// Output when the normalized response is at or above `threshold`.
    pub right: f32,
}

impl WeakClassifier {
    /// Tilted features are not evaluated; their outputs are forced to zero so
    /// they never move the stage sum.
    pub fn new(feature: HaarFeature, threshold: f32, left: f32, right: f32) -> Self {
        let (left, right) = if feature.tilted {
            (0.0, 0.0)
        } else {
            (left, right)
        };
        Self {
            feature,
            threshold,
            left,
            right,
        }
    }
}

/// One rejection stage: summed stump outputs compared against `threshold`.
#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub classifiers: Vec<WeakClassifier>,
    pub threshold: f32,
    /// Every classifier in the stage uses exactly two rectangles.
    pub two_rects: bool,
    /// Tree links as declared by the model. Evaluation walks `stages` in
    /// order and does not follow them.
    pub parent: Option<usize>,
    pub next: Option<usize>,
}

impl Stage {
    pub fn new(classifiers: Vec<WeakClassifier>, threshold: f32) -> Self {
        let two_rects = classifiers.iter().all(|c| c.feature.is_two_rect());
        Self {
            classifiers,
            threshold,
            two_rects,
            parent: None,
            next: None,
        }
    }

    pub fn with_links(mut self, parent: Option<usize>, next: Option<usize>) -> Self {
        self.parent = parent;
        self.next = next;
        self
    }
}

/// Ordered chain of stages trained on an `orig_window_size` base window.
#[derive(Clone, Debug, PartialEq)]
pub struct Cascade {
    orig_window_size: WindowSize,
    stages: Vec<Stage>,
    has_tilted_features: bool,
    is_tree: bool,
}

impl Cascade {
    pub fn new(orig_window_size: WindowSize, stages: Vec<Stage>) -> Self {
        let has_tilted_features = stages
            .iter()
            .flat_map(|s| s.classifiers.iter())
            .any(|c| c.feature.tilted);
        let is_tree = stages.iter().any(|s| s.next.is_some());
        Self {
            orig_window_size,
            stages,
            has_tilted_features,
            is_tree,
        }
    }

    #[inline]
    pub fn orig_window_size(&self) -> WindowSize {
        self.orig_window_size
    }

    #[inline]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[inline]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn classifier_count(&self) -> usize {
        self.stages.iter().map(|s| s.classifiers.len()).sum()
    }

    #[inline]
    pub fn has_tilted_features(&self) -> bool {
        self.has_tilted_features
    }

    /// Whether any stage declares a `next` link.
    #[inline]
    pub fn is_tree(&self) -> bool {
        self.is_tree
    }

    /// Copy of the cascade keeping only the first `stages` stages.
    pub fn truncated(&self, stages: usize) -> Cascade {
        let kept = self.stages[..stages.min(self.stages.len())]
            .iter()
            .cloned()
            .map(|mut s| {
                s.parent = s.parent.filter(|&p| p < stages);
                s.next = s.next.filter(|&n| n < stages);
                s
            })
            .collect();
        Cascade::new(self.orig_window_size, kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge_classifier(tilted: bool) -> WeakClassifier {
        let feature = HaarFeature::two(
            WeightedRect::new(0, 0, 4, 4, -1.0),
            WeightedRect::new(2, 0, 2, 4, 2.0),
        )
        .with_tilted(tilted);
        WeakClassifier::new(feature, 0.1, -1.0, 1.0)
    }

    #[test]
    fn tilted_classifier_outputs_are_zeroed() {
        let c = edge_classifier(true);
        assert_eq!((c.left, c.right), (0.0, 0.0));
        let c = edge_classifier(false);
        assert_eq!((c.left, c.right), (-1.0, 1.0));
    }

    #[test]
    fn flags_follow_stage_contents() {
        let three = WeakClassifier::new(
            HaarFeature::three(
                WeightedRect::new(0, 0, 6, 2, -1.0),
                WeightedRect::new(2, 0, 2, 2, 3.0),
                WeightedRect::new(0, 0, 1, 1, 0.0),
            ),
            0.0,
            1.0,
            -1.0,
        );
        let s0 = Stage::new(vec![edge_classifier(false)], 0.0);
        let s1 = Stage::new(vec![edge_classifier(true), three], 0.0).with_links(Some(0), None);
        assert!(s0.two_rects);
        assert!(!s1.two_rects);
        let cascade = Cascade::new(WindowSize::new(4, 4), vec![s0, s1]);
        assert!(cascade.has_tilted_features());
        assert!(!cascade.is_tree());
        assert_eq!(cascade.classifier_count(), 3);

        let cut = cascade.truncated(1);
        assert_eq!(cut.stage_count(), 1);
        assert!(!cut.has_tilted_features());
    }
}
