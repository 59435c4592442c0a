//! Summed-area tables over a single-channel 8-bit image.
//!
//! Both tables are `(w + 1) × (h + 1)` with a zero first row and column, so
//! the sum over any axis-aligned rectangle is
//! `sum[br] - sum[tr] - sum[bl] + sum[tl]` without border checks.
//!
//! Design
//! - One pass, top to bottom: a running row sum `s` is added to the entry
//!   directly above, which is equivalent to
//!   `sum[x,y] = in[x,y] + sum[x-1,y] + sum[x,y-1] - sum[x-1,y-1]`.
//! - `sqsum` accumulates squared pixels in `f64` the same way.
//! - `build_sum_only` skips the squares for mean-only consumers.
//! - Sums are `i32`; images whose worst-case total would overflow are refused.
use crate::image::{GrayRows, ImageU8};
use crate::types::Rect;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegralError {
    #[error("cannot build an integral image over an empty {width}x{height} image")]
    Empty { width: usize, height: usize },
    #[error("image view {width}x{height} with stride {stride} does not fit its {len}-byte buffer")]
    InvalidView {
        width: usize,
        height: usize,
        stride: usize,
        len: usize,
    },
    #[error("image {width}x{height} is too large for 32-bit integral sums")]
    TooLarge { width: usize, height: usize },
    #[error("failed to allocate integral buffers of {elements} elements")]
    Alloc { elements: usize },
}

/// Prefix sums (and optionally prefix sums of squares) of an 8-bit image.
#[derive(Clone, Debug)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    sum: Vec<i32>,
    sqsum: Option<Vec<f64>>,
}

impl IntegralImage {
    /// Build `sum` and `sqsum` for `image`.
    pub fn build(image: ImageU8<'_>) -> Result<Self, IntegralError> {
        Self::build_impl(image, true)
    }

    /// Build `sum` only. Windows cannot be variance-normalized against the
    /// result, so scanning it fails.
    pub fn build_sum_only(image: ImageU8<'_>) -> Result<Self, IntegralError> {
        Self::build_impl(image, false)
    }

    fn build_impl(image: ImageU8<'_>, with_squares: bool) -> Result<Self, IntegralError> {
        let (width, height) = (image.w, image.h);
        if width == 0 || height == 0 {
            return Err(IntegralError::Empty { width, height });
        }
        let max_total = (width as u64)
            .saturating_mul(height as u64)
            .saturating_mul(255);
        if max_total > i32::MAX as u64 {
            return Err(IntegralError::TooLarge { width, height });
        }
        if ImageU8::with_stride(width, height, image.stride, image.data).is_none() {
            return Err(IntegralError::InvalidView {
                width,
                height,
                stride: image.stride,
                len: image.data.len(),
            });
        }

        let stride = width + 1;
        let elements = stride * (height + 1);
        let mut sum = zeroed::<i32>(elements)?;

        if with_squares {
            let mut sqsum = zeroed::<f64>(elements)?;
            for (y, src) in image.rows().enumerate() {
                let above = y * stride;
                let here = above + stride;
                let mut s = 0i32;
                let mut sq = 0f64;
                for (x, &px) in src.iter().enumerate() {
                    let v = px as i32;
                    s += v;
                    sq += (v * v) as f64;
                    sum[here + x + 1] = sum[above + x + 1] + s;
                    sqsum[here + x + 1] = sqsum[above + x + 1] + sq;
                }
            }
            Ok(Self {
                width,
                height,
                sum,
                sqsum: Some(sqsum),
            })
        } else {
            for (y, src) in image.rows().enumerate() {
                let above = y * stride;
                let here = above + stride;
                let mut s = 0i32;
                for (x, &px) in src.iter().enumerate() {
                    s += px as i32;
                    sum[here + x + 1] = sum[above + x + 1] + s;
                }
            }
            Ok(Self {
                width,
                height,
                sum,
                sqsum: None,
            })
        }
    }

    /// Width of the source image.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the source image.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row stride of both tables (`width + 1`).
    #[inline]
    pub fn sum_width(&self) -> usize {
        self.width + 1
    }

    /// Number of table rows (`height + 1`).
    #[inline]
    pub fn sum_height(&self) -> usize {
        self.height + 1
    }

    #[inline]
    pub fn sum(&self) -> &[i32] {
        &self.sum
    }

    #[inline]
    pub fn sqsum(&self) -> Option<&[f64]> {
        self.sqsum.as_deref()
    }

    #[inline]
    pub fn has_squares(&self) -> bool {
        self.sqsum.is_some()
    }

    /// Sum of pixels inside `r`. `r` must lie within the image.
    pub fn rect_sum(&self, r: Rect) -> i64 {
        let [tl, tr, bl, br] = self.corners(r);
        self.sum[br] as i64 - self.sum[tr] as i64 - self.sum[bl] as i64 + self.sum[tl] as i64
    }

    /// Sum of squared pixels inside `r`, or `None` for a sum-only image.
    pub fn rect_sqsum(&self, r: Rect) -> Option<f64> {
        let sq = self.sqsum.as_ref()?;
        let [tl, tr, bl, br] = self.corners(r);
        Some(sq[br] - sq[tr] - sq[bl] + sq[tl])
    }

    fn corners(&self, r: Rect) -> [usize; 4] {
        let stride = self.sum_width();
        let tl = r.y as usize * stride + r.x as usize;
        let bl = (r.y + r.height) as usize * stride + r.x as usize;
        [tl, tl + r.width as usize, bl, bl + r.width as usize]
    }
}

fn zeroed<T: Copy + Default>(elements: usize) -> Result<Vec<T>, IntegralError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(elements)
        .map_err(|_| IntegralError::Alloc { elements })?;
    buf.resize(elements, T::default());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(w: usize, h: usize) -> Vec<u8> {
        (0..w * h).map(|i| ((i * 37 + i / w * 11) % 256) as u8).collect()
    }

    fn brute_sum(data: &[u8], stride: usize, r: Rect) -> i64 {
        let mut s = 0i64;
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                s += data[y as usize * stride + x as usize] as i64;
            }
        }
        s
    }

    #[test]
    fn four_corner_sum_matches_brute_force() {
        let (w, h) = (13usize, 9usize);
        let data = ramp(w, h);
        let img = ImageU8::new(w, h, &data).expect("view");
        let integral = IntegralImage::build(img).expect("integral");
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                for (rw, rh) in [(1, 1), (w as i32 - x, h as i32 - y), (2, 3)] {
                    if x + rw > w as i32 || y + rh > h as i32 {
                        continue;
                    }
                    let r = Rect::new(x, y, rw, rh);
                    assert_eq!(integral.rect_sum(r), brute_sum(&data, w, r), "rect {:?}", r);
                }
            }
        }
        let full = Rect::new(0, 0, w as i32, h as i32);
        assert_eq!(integral.rect_sum(full), brute_sum(&data, w, full));
    }

    #[test]
    fn squares_match_brute_force() {
        let data = [3u8, 4, 5, 6, 7, 8];
        let img = ImageU8::new(3, 2, &data).expect("view");
        let integral = IntegralImage::build(img).expect("integral");
        let r = Rect::new(1, 0, 2, 2);
        let expected = (4 * 4 + 5 * 5 + 7 * 7 + 8 * 8) as f64;
        assert_eq!(integral.rect_sqsum(r), Some(expected));
    }

    #[test]
    fn border_row_and_column_are_zero() {
        let data = ramp(5, 4);
        let integral = IntegralImage::build(ImageU8::new(5, 4, &data).unwrap()).unwrap();
        let stride = integral.sum_width();
        assert!(integral.sum()[..stride].iter().all(|&v| v == 0));
        assert!((0..integral.sum_height()).all(|y| integral.sum()[y * stride] == 0));
    }

    #[test]
    fn strided_input_ignores_padding() {
        let data = [1u8, 2, 99, 3, 4, 99];
        let img = ImageU8::with_stride(2, 2, 3, &data).expect("view");
        let integral = IntegralImage::build(img).expect("integral");
        assert_eq!(integral.rect_sum(Rect::new(0, 0, 2, 2)), 10);
    }

    #[test]
    fn sum_only_path_matches_full_build() {
        let data = ramp(7, 6);
        let img = ImageU8::new(7, 6, &data).unwrap();
        let full = IntegralImage::build(img).unwrap();
        let light = IntegralImage::build_sum_only(img).unwrap();
        assert_eq!(full.sum(), light.sum());
        assert!(!light.has_squares());
        assert!(light.rect_sqsum(Rect::new(0, 0, 1, 1)).is_none());
    }

    #[test]
    fn empty_and_oversized_images_are_refused() {
        let img = ImageU8 {
            w: 0,
            h: 3,
            stride: 0,
            data: &[],
        };
        assert!(matches!(
            IntegralImage::build(img),
            Err(IntegralError::Empty { .. })
        ));
        let huge = ImageU8 {
            w: 100_000,
            h: 100_000,
            stride: 100_000,
            data: &[],
        };
        assert!(matches!(
            IntegralImage::build(huge),
            Err(IntegralError::TooLarge { .. })
        ));
    }

    #[test]
    fn views_that_overrun_their_buffer_are_refused() {
        let data = [0u8; 10];
        let short = ImageU8 {
            w: 20,
            h: 20,
            stride: 20,
            data: &data,
        };
        assert!(matches!(
            IntegralImage::build(short),
            Err(IntegralError::InvalidView { len: 10, .. })
        ));
        let narrow = ImageU8 {
            w: 4,
            h: 2,
            stride: 3,
            data: &data,
        };
        assert!(matches!(
            IntegralImage::build_sum_only(narrow),
            Err(IntegralError::InvalidView { stride: 3, .. })
        ));
        let huge_stride = ImageU8 {
            w: 2,
            h: 2,
            stride: usize::MAX,
            data: &data,
        };
        assert!(matches!(
            IntegralImage::build(huge_stride),
            Err(IntegralError::InvalidView { .. })
        ));
    }
}
