//! Stage-wise evaluation of one window.
//!
//! The window is normalised by the standard deviation of its inset rect; each
//! stump compares its raw feature response against `threshold · std`. A stage
//! rejects as soon as its summed outputs fall below the stage threshold, so
//! most windows cost one or two stages.
use super::scaling::{ScaledCascade, ScaledFeature, ScaledRect};
use crate::cascade::WeakClassifier;
use crate::integral::IntegralImage;
use serde::Serialize;

/// Result of running the cascade over one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowOutcome {
    /// Every stage passed.
    Accepted,
    /// Stage `n` (0-based) rejected the window.
    Rejected(usize),
    /// No decision: flat window, out-of-range position or degenerate scale.
    Indeterminate,
}

impl WindowOutcome {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, WindowOutcome::Accepted)
    }

    #[inline]
    pub fn rejected_stage(&self) -> Option<usize> {
        match *self {
            WindowOutcome::Rejected(stage) => Some(stage),
            _ => None,
        }
    }
}

#[inline]
fn corner_sum_i32(table: &[i32], base: usize, off: &[isize; 4]) -> f64 {
    let at = |o: isize| table[(base as isize + o) as usize] as i64;
    (at(off[3]) - at(off[1]) - at(off[2]) + at(off[0])) as f64
}

#[inline]
fn corner_sum_f64(table: &[f64], base: usize, off: &[isize; 4]) -> f64 {
    let at = |o: isize| table[(base as isize + o) as usize];
    at(off[3]) - at(off[1]) - at(off[2]) + at(off[0])
}

#[inline]
fn rect_response(sum: &[i32], base: usize, r: &ScaledRect) -> f64 {
    corner_sum_i32(sum, base, &r.offsets) * r.weight
}

#[inline]
fn stump_output(c: &WeakClassifier, raw: f64, std: f64) -> f64 {
    if raw >= f64::from(c.threshold) * std {
        f64::from(c.right)
    } else {
        f64::from(c.left)
    }
}

impl ScaledCascade<'_> {
    /// Evaluate the window whose top-left corner is `(x, y)`.
    pub fn evaluate(
        &self,
        integral: &IntegralImage,
        x: i32,
        y: i32,
        min_std: f64,
    ) -> WindowOutcome {
        self.evaluate_from(integral, x, y, min_std, 0)
    }

    /// Like [`evaluate`](Self::evaluate) but skips stages before `start_stage`.
    pub fn evaluate_from(
        &self,
        integral: &IntegralImage,
        x: i32,
        y: i32,
        min_std: f64,
        start_stage: usize,
    ) -> WindowOutcome {
        if self.inv_window_area() == 0.0 || integral.sum_width() != self.stride() {
            return WindowOutcome::Indeterminate;
        }
        let Some(sqsum) = integral.sqsum() else {
            return WindowOutcome::Indeterminate;
        };
        if !self.window_fits(x, y, integral.sum_width(), integral.sum_height()) {
            return WindowOutcome::Indeterminate;
        }
        let sum = integral.sum();
        let base = y as usize * self.stride() + x as usize;

        let inv_area = self.inv_window_area();
        let mean = corner_sum_i32(sum, base, self.window_offsets()) * inv_area;
        let variance = corner_sum_f64(sqsum, base, self.window_offsets()) * inv_area - mean * mean;
        let std = if variance >= 0.0 { variance.sqrt() } else { 1.0 };
        if std < min_std {
            return WindowOutcome::Indeterminate;
        }

        let stages = self.cascade().stages();
        for (index, stage) in stages.iter().enumerate().skip(start_stage) {
            let features = self.stage_features(index);
            let pairs = stage.classifiers.iter().zip(features);
            let stage_sum: f64 = if stage.two_rects {
                pairs
                    .map(|(c, f)| {
                        let r = f.rects();
                        let raw = rect_response(sum, base, &r[0]) + rect_response(sum, base, &r[1]);
                        stump_output(c, raw, std)
                    })
                    .sum()
            } else {
                pairs
                    .map(|(c, f)| stump_output(c, feature_response(sum, base, f), std))
                    .sum()
            };
            if stage_sum < f64::from(stage.threshold) {
                return WindowOutcome::Rejected(index);
            }
        }
        WindowOutcome::Accepted
    }
}

#[inline]
fn feature_response(sum: &[i32], base: usize, f: &ScaledFeature) -> f64 {
    f.rects().iter().map(|r| rect_response(sum, base, r)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{Cascade, HaarFeature, Stage, WeightedRect};
    use crate::image::ImageU8;
    use crate::types::WindowSize;

    /// Left half dark, right half bright edge detector on a 20x20 window.
    fn edge_stage(stage_threshold: f32) -> Stage {
        let feature = HaarFeature::two(
            WeightedRect::new(0, 0, 20, 20, -1.0),
            WeightedRect::new(10, 0, 10, 20, 2.0),
        );
        Stage::new(
            vec![WeakClassifier::new(feature, 0.5, -1.0, 1.0)],
            stage_threshold,
        )
    }

    fn image_with_edge(w: usize, h: usize, edge_x: usize) -> Vec<u8> {
        (0..w * h)
            .map(|i| if i % w >= edge_x { 255 } else { 0 })
            .collect()
    }

    #[test]
    fn edge_window_is_accepted_and_flat_window_is_indeterminate() {
        let cascade = Cascade::new(WindowSize::new(20, 20), vec![edge_stage(0.0)]);
        let data = image_with_edge(40, 30, 20);
        let integral = IntegralImage::build(ImageU8::new(40, 30, &data).unwrap()).unwrap();
        let bound = ScaledCascade::bind(&cascade, &integral, 1.0);

        assert_eq!(bound.evaluate(&integral, 10, 5, 10.0), WindowOutcome::Accepted);
        // Window entirely on the bright side has zero variance.
        assert_eq!(
            bound.evaluate(&integral, 20, 5, 10.0),
            WindowOutcome::Indeterminate
        );
        // Reversed polarity: the bright half is on the left of the window.
        let data = image_with_edge(40, 30, 10);
        let flipped: Vec<u8> = data.iter().map(|&v| 255 - v).collect();
        let integral = IntegralImage::build(ImageU8::new(40, 30, &flipped).unwrap()).unwrap();
        assert_eq!(
            bound.evaluate(&integral, 0, 5, 10.0),
            WindowOutcome::Rejected(0)
        );
    }

    #[test]
    fn out_of_range_window_is_indeterminate() {
        let cascade = Cascade::new(WindowSize::new(20, 20), vec![edge_stage(0.0)]);
        let data = image_with_edge(40, 30, 20);
        let integral = IntegralImage::build(ImageU8::new(40, 30, &data).unwrap()).unwrap();
        let bound = ScaledCascade::bind(&cascade, &integral, 1.0);
        for (x, y) in [(21, 0), (0, 11), (-1, 0), (1000, 1000)] {
            assert_eq!(
                bound.evaluate(&integral, x, y, 0.0),
                WindowOutcome::Indeterminate,
                "window at ({x}, {y})"
            );
        }

        // Inset features leave the window origin unread; a negative origin
        // must still be refused.
        let inset = HaarFeature::two(
            WeightedRect::new(2, 2, 16, 16, -1.0),
            WeightedRect::new(10, 2, 8, 16, 2.0),
        );
        let cascade = Cascade::new(
            WindowSize::new(20, 20),
            vec![Stage::new(
                vec![WeakClassifier::new(inset, 0.5, -1.0, 1.0)],
                0.0,
            )],
        );
        let bound = ScaledCascade::bind(&cascade, &integral, 1.0);
        for (x, y) in [(-1, 3), (3, -1), (-2, -2)] {
            assert_eq!(
                bound.evaluate(&integral, x, y, 0.0),
                WindowOutcome::Indeterminate,
                "inset window at ({x}, {y})"
            );
        }
        assert!(!bound.window_fits(-1, 3, integral.sum_width(), integral.sum_height()));
    }

    #[test]
    fn sum_only_integral_never_decides() {
        let cascade = Cascade::new(WindowSize::new(20, 20), vec![edge_stage(0.0)]);
        let data = image_with_edge(40, 30, 20);
        let integral = IntegralImage::build_sum_only(ImageU8::new(40, 30, &data).unwrap()).unwrap();
        let bound = ScaledCascade::bind(&cascade, &integral, 1.0);
        assert_eq!(
            bound.evaluate(&integral, 10, 5, 0.0),
            WindowOutcome::Indeterminate
        );
    }

    #[test]
    fn truncated_cascade_reproduces_rejecting_stage() {
        // Stage 2 demands more than one stump can give, so every decided
        // window is rejected there.
        let stages = vec![edge_stage(0.0), edge_stage(-0.5), edge_stage(2.0)];
        let cascade = Cascade::new(WindowSize::new(20, 20), stages);
        let data = image_with_edge(40, 30, 20);
        let integral = IntegralImage::build(ImageU8::new(40, 30, &data).unwrap()).unwrap();
        let bound = ScaledCascade::bind(&cascade, &integral, 1.0);

        let mut decided = 0;
        for y in 0..10 {
            for x in 0..20 {
                let outcome = bound.evaluate(&integral, x, y, 10.0);
                let Some(stage) = outcome.rejected_stage() else {
                    continue;
                };
                decided += 1;
                let prefix = cascade.truncated(stage + 1);
                let prefix_bound = ScaledCascade::bind(&prefix, &integral, 1.0);
                assert_eq!(
                    prefix_bound.evaluate(&integral, x, y, 10.0),
                    WindowOutcome::Rejected(stage),
                    "window ({x}, {y})"
                );
                if stage > 0 {
                    let shorter = cascade.truncated(stage);
                    let shorter_bound = ScaledCascade::bind(&shorter, &integral, 1.0);
                    assert_eq!(
                        shorter_bound.evaluate(&integral, x, y, 10.0),
                        WindowOutcome::Accepted,
                        "window ({x}, {y}) with {stage} stages"
                    );
                }
            }
        }
        assert!(decided > 0, "expected at least one rejected window");
    }

    #[test]
    fn evaluate_from_skips_earlier_stages() {
        let stages = vec![edge_stage(5.0), edge_stage(0.0)];
        let cascade = Cascade::new(WindowSize::new(20, 20), stages);
        let data = image_with_edge(40, 30, 20);
        let integral = IntegralImage::build(ImageU8::new(40, 30, &data).unwrap()).unwrap();
        let bound = ScaledCascade::bind(&cascade, &integral, 1.0);
        assert_eq!(
            bound.evaluate(&integral, 10, 5, 10.0),
            WindowOutcome::Rejected(0)
        );
        assert_eq!(
            bound.evaluate_from(&integral, 10, 5, 10.0, 1),
            WindowOutcome::Accepted
        );
    }
}
