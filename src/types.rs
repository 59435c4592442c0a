use serde::{Deserialize, Serialize};

pub use crate::image::ImageU8;

/// Integer axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Area shared with `other`, zero when the two do not overlap.
    pub fn intersection_area(&self, other: &Rect) -> i64 {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            0
        } else {
            (x1 - x0) as i64 * (y1 - y0) as i64
        }
    }

    /// Clamp to a `width × height` image: negative origins move to 0, origins
    /// past the edge move onto it and the extent is cut to fit.
    pub fn clamp_to(&self, width: usize, height: usize) -> Rect {
        let (w, h) = (width as i32, height as i32);
        let x = self.x.clamp(0, w);
        let y = self.y.clamp(0, h);
        let width = if x + self.width > w { w - x } else { self.width };
        let height = if y + self.height > h { h - y } else { self.height };
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Width/height pair used for detection windows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: i32,
    pub height: i32,
}

impl WindowSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Window scaled by `factor`, rounded half away from zero per axis.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            width: round_half_away(self.width as f64 * factor),
            height: round_half_away(self.height as f64 * factor),
        }
    }
}

/// Object hypothesis at original image scale.
///
/// `hits` counts how many raw scan hits the box represents: 1 straight out of
/// the scanner, the cluster size after merging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub hits: u32,
}

impl Detection {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            hits: 1,
        }
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl From<Rect> for Detection {
    fn from(r: Rect) -> Self {
        Detection::new(r.x, r.y, r.width, r.height)
    }
}

/// Round half away from zero, the rounding used throughout scale binding.
#[inline]
pub fn round_half_away(v: f64) -> i32 {
    v.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_half_away(2.5), 3);
        assert_eq!(round_half_away(-2.5), -3);
        assert_eq!(round_half_away(2.49), 2);
    }

    #[test]
    fn clamp_moves_origin_and_cuts_extent() {
        let r = Rect::new(-4, 10, 50, 200).clamp_to(40, 100);
        assert_eq!(r, Rect::new(0, 10, 40, 90));
        let outside = Rect::new(60, 120, 10, 10).clamp_to(40, 100);
        assert_eq!(outside.x, 40);
        assert_eq!(outside.y, 100);
        assert_eq!(outside.width, 0);
        assert_eq!(outside.height, 0);
    }

    #[test]
    fn intersection_of_disjoint_rects_is_empty() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.intersection_area(&Rect::new(10, 0, 10, 10)), 0);
        assert_eq!(a.intersection_area(&Rect::new(5, 5, 10, 10)), 25);
    }
}
