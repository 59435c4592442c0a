//! Per-scale binding of a cascade to an integral image layout.
//!
//! Binding turns every feature rectangle into four corner offsets into the
//! flattened `(w + 1) × (h + 1)` tables and rescales the weights so each
//! feature stays zero-sum at the new size. The result borrows the cascade and
//! never mutates it; one [`ScaledCascade`] exists per scale of a scan.
//!
//! Rectangle remapping
//! - Each feature is inspected for a common "base" cell: the smallest of all
//!   `width - 1` and `x - x0 - 1` values taken as unsigned (so negative
//!   candidates drop out), plus one. `kx = w0 / base_w`.
//! - When `kx <= 0` the width axis is remapped relative to the primary
//!   rectangle (`new_base_w = round(w0·s) / kx`); otherwise every coordinate
//!   is rounded independently. The height axis makes the same choice on its
//!   own.
use crate::cascade::{Cascade, HaarFeature};
use crate::integral::IntegralImage;
use crate::types::{round_half_away, Rect, WindowSize};
use log::debug;

/// Feature rectangle bound to one scale.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScaledRect {
    /// Rectangle relative to the window origin at this scale.
    pub rect: Rect,
    /// `[tl, tr, bl, br]` relative to the window's top-left table index.
    pub offsets: [isize; 4],
    pub weight: f64,
}

/// Two or three bound rectangles of one classifier's feature.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaledFeature {
    rects: [ScaledRect; 3],
    count: usize,
}

impl ScaledFeature {
    #[inline]
    pub fn rects(&self) -> &[ScaledRect] {
        &self.rects[..self.count]
    }

    /// `Σ weight·area`; zero up to rounding for a well-formed feature.
    pub fn residual(&self) -> f64 {
        self.rects()
            .iter()
            .map(|r| r.weight * r.rect.area() as f64)
            .sum()
    }
}

/// Scale-dependent view over an immutable [`Cascade`].
#[derive(Clone, Debug)]
pub struct ScaledCascade<'c> {
    cascade: &'c Cascade,
    scale: f64,
    stride: usize,
    real_window_size: WindowSize,
    window_rect: Rect,
    window_offsets: [isize; 4],
    inv_window_area: f64,
    /// Bound features, one `Vec` per stage in classifier order.
    stages: Vec<Vec<ScaledFeature>>,
    /// Smallest and largest corner coordinates touched relative to the
    /// window origin, over the normalisation rect and every feature rect.
    min_corner: (i32, i32),
    max_corner: (i32, i32),
}

impl<'c> ScaledCascade<'c> {
    /// Bind `cascade` at `scale` for tables laid out like `integral`.
    pub fn bind(cascade: &'c Cascade, integral: &IntegralImage, scale: f64) -> Self {
        Self::bind_with_stride(cascade, integral.sum_width(), scale)
    }

    /// Bind `cascade` at `scale` for tables with row stride `stride`.
    pub fn bind_with_stride(cascade: &'c Cascade, stride: usize, scale: f64) -> Self {
        let orig = cascade.orig_window_size();
        let real_window_size = orig.scaled(scale);

        let inset = round_half_away(scale);
        let window_rect = Rect::new(
            inset,
            inset,
            round_half_away((orig.width - 2) as f64 * scale),
            round_half_away((orig.height - 2) as f64 * scale),
        );
        let inv_window_area = if window_rect.width > 0 && window_rect.height > 0 {
            1.0 / window_rect.area() as f64
        } else {
            0.0
        };

        let mut min_corner = (window_rect.x, window_rect.y);
        let mut max_corner = (window_rect.right(), window_rect.bottom());
        let mut track = |r: &Rect| {
            min_corner.0 = min_corner.0.min(r.x).min(r.right());
            min_corner.1 = min_corner.1.min(r.y).min(r.bottom());
            max_corner.0 = max_corner.0.max(r.x).max(r.right());
            max_corner.1 = max_corner.1.max(r.y).max(r.bottom());
        };

        let mut stages = Vec::with_capacity(cascade.stage_count());
        for stage in cascade.stages() {
            let mut bound = Vec::with_capacity(stage.classifiers.len());
            for classifier in &stage.classifiers {
                let feature = bind_feature(&classifier.feature, scale, inv_window_area, stride);
                for r in feature.rects() {
                    track(&r.rect);
                }
                bound.push(feature);
            }
            stages.push(bound);
        }

        debug!(
            "bind scale={:.3} window={}x{} norm={:?} inv_area={:.3e}",
            scale, real_window_size.width, real_window_size.height, window_rect, inv_window_area
        );

        Self {
            cascade,
            scale,
            stride,
            real_window_size,
            window_rect,
            window_offsets: corner_offsets(&window_rect, stride),
            inv_window_area,
            stages,
            min_corner,
            max_corner,
        }
    }

    #[inline]
    pub fn cascade(&self) -> &'c Cascade {
        self.cascade
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Row stride of the tables this view was bound for.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn real_window_size(&self) -> WindowSize {
        self.real_window_size
    }

    /// Inset rectangle used for mean/variance normalisation.
    #[inline]
    pub fn window_rect(&self) -> Rect {
        self.window_rect
    }

    #[inline]
    pub(crate) fn window_offsets(&self) -> &[isize; 4] {
        &self.window_offsets
    }

    #[inline]
    pub fn inv_window_area(&self) -> f64 {
        self.inv_window_area
    }

    #[inline]
    pub fn stage_features(&self, stage: usize) -> &[ScaledFeature] {
        &self.stages[stage]
    }

    /// Bound features in cascade order, flattened across stages.
    pub fn features(&self) -> impl Iterator<Item = &ScaledFeature> {
        self.stages.iter().flatten()
    }

    /// `Σ weight·area` of the `index`-th classifier in cascade order.
    pub fn feature_residual(&self, index: usize) -> Option<f64> {
        self.features().nth(index).map(ScaledFeature::residual)
    }

    /// Whether the window anchored at `(x, y)` starts inside the image and
    /// every corner it reads lies inside a `sum_width × sum_height` table.
    #[inline]
    pub fn window_fits(&self, x: i32, y: i32, sum_width: usize, sum_height: usize) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        let (x, y) = (x as i64, y as i64);
        x + self.min_corner.0 as i64 >= 0
            && y + self.min_corner.1 as i64 >= 0
            && x + (self.max_corner.0 as i64) < sum_width as i64
            && y + (self.max_corner.1 as i64) < sum_height as i64
    }
}

fn corner_offsets(r: &Rect, stride: usize) -> [isize; 4] {
    let stride = stride as isize;
    let tl = r.y as isize * stride + r.x as isize;
    let bl = (r.y + r.height) as isize * stride + r.x as isize;
    [tl, tl + r.width as isize, bl, bl + r.width as isize]
}

/// Unsigned minimum over the base-cell candidates of one axis, as a signed
/// cell size. All-negative candidates wrap to `u32::MAX` and yield 0.
fn base_cell(candidates: impl Iterator<Item = i32>) -> i32 {
    let min = candidates.fold(u32::MAX, |acc, v| acc.min(v as u32));
    (min as i32).wrapping_add(1)
}

/// Axis remapping decided once per feature and per axis.
enum AxisMap {
    Direct,
    Anchored { base: i32, new_base: i32, origin: i32, scaled_origin: i32 },
}

impl AxisMap {
    fn new(origin: i32, extent: i32, base: i32, scale: f64) -> Self {
        let k = if base == 0 { 0 } else { extent / base };
        if k > 0 {
            return AxisMap::Direct;
        }
        let new_base = if k == 0 {
            0
        } else {
            round_half_away(extent as f64 * scale) / k
        };
        AxisMap::Anchored {
            base,
            new_base,
            origin,
            scaled_origin: round_half_away(origin as f64 * scale),
        }
    }

    /// Map `(position, extent)` along this axis.
    fn apply(&self, pos: i32, extent: i32, scale: f64) -> (i32, i32) {
        match *self {
            AxisMap::Direct => (
                round_half_away(pos as f64 * scale),
                round_half_away(extent as f64 * scale),
            ),
            AxisMap::Anchored {
                base,
                new_base,
                origin,
                scaled_origin,
            } => {
                let ratio = |v: i32| -> i32 {
                    (v as i64 * new_base as i64)
                        .checked_div(base as i64)
                        .unwrap_or(0) as i32
                };
                (ratio(pos - origin) + scaled_origin, ratio(extent))
            }
        }
    }
}

fn bind_feature(
    feature: &HaarFeature,
    scale: f64,
    inv_window_area: f64,
    stride: usize,
) -> ScaledFeature {
    let rects = feature.rects();
    let r0 = rects[0].rect;

    let base_w = base_cell(
        rects
            .iter()
            .flat_map(|r| [r.rect.width - 1, r.rect.x - r0.x - 1]),
    );
    let base_h = base_cell(
        rects
            .iter()
            .flat_map(|r| [r.rect.height - 1, r.rect.y - r0.y - 1]),
    );
    let map_x = AxisMap::new(r0.x, r0.width, base_w, scale);
    let map_y = AxisMap::new(r0.y, r0.height, base_h, scale);

    let correction = if feature.tilted { 0.5 } else { 1.0 };
    let mut out = [ScaledRect::default(); 3];
    for (slot, wr) in out.iter_mut().zip(rects) {
        let (x, width) = map_x.apply(wr.rect.x, wr.rect.width, scale);
        let (y, height) = map_y.apply(wr.rect.y, wr.rect.height, scale);
        let rect = Rect::new(x, y, width, height);
        *slot = ScaledRect {
            rect,
            offsets: corner_offsets(&rect, stride),
            weight: f64::from(wr.weight) * inv_window_area * correction,
        };
    }

    let count = rects.len();
    let area0 = out[0].rect.area() as f64;
    if area0 == 0.0 {
        for r in out.iter_mut() {
            r.weight = 0.0;
        }
    } else {
        let others: f64 = out[1..count]
            .iter()
            .map(|r| r.weight * r.rect.area() as f64)
            .sum();
        out[0].weight = -others / area0;
    }

    ScaledFeature { rects: out, count }
}
