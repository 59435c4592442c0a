//! Borrowed single-channel 8-bit image view.
//!
//! This is the detector's image source: width, height, a row stride in bytes
//! and row-major pixel data. The detector only ever reads through it.
use super::GrayRows;

#[derive(Clone, Copy, Debug)]
pub struct ImageU8<'a> {
    pub w: usize,
    pub h: usize,
    pub stride: usize, // bytes between rows
    pub data: &'a [u8],
}

impl<'a> ImageU8<'a> {
    /// Tightly packed view (`stride == w`) over `data`.
    ///
    /// Returns `None` when `data` is too short for `w × h` pixels.
    pub fn new(w: usize, h: usize, data: &'a [u8]) -> Option<Self> {
        Self::with_stride(w, h, w, data)
    }

    /// View with an explicit row stride, validated against `data`.
    pub fn with_stride(w: usize, h: usize, stride: usize, data: &'a [u8]) -> Option<Self> {
        if stride < w {
            return None;
        }
        let needed = match h {
            0 => Some(0),
            _ => (h - 1).checked_mul(stride).and_then(|n| n.checked_add(w)),
        };
        match needed {
            Some(n) if data.len() >= n => Some(Self { w, h, stride, data }),
            _ => None,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }
}

impl GrayRows for ImageU8<'_> {
    #[inline]
    fn width(&self) -> usize {
        self.w
    }

    #[inline]
    fn height(&self) -> usize {
        self.h
    }

    #[inline]
    fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}
