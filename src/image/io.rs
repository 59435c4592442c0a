//! File I/O for the command-line tools: decoded grayscale frames, overlays
//! and JSON reports.
use super::{GrayRows, ImageU8};
use crate::types::Rect;
use image::{GrayImage, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Decoded 8-bit frame, tightly packed.
#[derive(Clone, Debug)]
pub struct GrayFrame {
    pixels: GrayImage,
}

impl GrayFrame {
    /// Decode any format the `image` crate was built with and convert to luma.
    pub fn open(path: &Path) -> Result<Self, String> {
        let pixels = image::open(path)
            .map_err(|e| format!("Failed to decode frame {}: {e}", path.display()))?
            .into_luma8();
        Ok(Self { pixels })
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        GrayImage::from_raw(width as u32, height as u32, data).map(|pixels| Self { pixels })
    }

    pub fn view(&self) -> ImageU8<'_> {
        let w = self.pixels.width() as usize;
        ImageU8 {
            w,
            h: self.pixels.height() as usize,
            stride: w,
            data: self.pixels.as_raw(),
        }
    }

    /// Outline `rect` one pixel wide, clipped to the frame.
    pub fn outline(&mut self, rect: Rect, value: u8) {
        let (w, h) = (self.pixels.width() as i32, self.pixels.height() as i32);
        if w == 0 || h == 0 || rect.width <= 0 || rect.height <= 0 {
            return;
        }
        let (x0, x1) = (rect.x.clamp(0, w - 1), (rect.right() - 1).clamp(0, w - 1));
        let (y0, y1) = (rect.y.clamp(0, h - 1), (rect.bottom() - 1).clamp(0, h - 1));
        let ink = Luma([value]);
        for x in x0..=x1 {
            self.pixels.put_pixel(x as u32, y0 as u32, ink);
            self.pixels.put_pixel(x as u32, y1 as u32, ink);
        }
        for y in y0..=y1 {
            self.pixels.put_pixel(x0 as u32, y as u32, ink);
            self.pixels.put_pixel(x1 as u32, y as u32, ink);
        }
    }

    /// Encode to `path`; the extension picks the format.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        ensure_parent_dir(path)?;
        self.pixels
            .save(path)
            .map_err(|e| format!("Failed to save frame {}: {e}", path.display()))
    }
}

impl GrayRows for GrayFrame {
    fn width(&self) -> usize {
        self.pixels.width() as usize
    }

    fn height(&self) -> usize {
        self.pixels.height() as usize
    }

    fn row(&self, y: usize) -> &[u8] {
        let w = self.width();
        &self.pixels.as_raw()[y * w..(y + 1) * w]
    }
}

/// Pretty-print `value` to `path`.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to encode {} as JSON: {e}", path.display()))?;
    write_text_file(path, &json)
}

/// Write `contents` to `path`, creating missing parent directories.
pub fn write_text_file(path: &Path, contents: &str) -> Result<(), String> {
    ensure_parent_dir(path)?;
    fs::write(path, contents).map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create directory {}: {e}", dir.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_is_clipped_to_frame() {
        let mut frame = GrayFrame::from_raw(8, 6, vec![0; 48]).expect("frame");
        frame.outline(Rect::new(4, 2, 10, 10), 255);
        let view = frame.view();
        assert_eq!(view.get(4, 2), 255);
        assert_eq!(view.get(7, 5), 255);
        assert_eq!(view.get(5, 3), 0);
        assert_eq!(view.get(3, 2), 0);
    }

    #[test]
    fn rows_match_view() {
        let frame = GrayFrame::from_raw(3, 2, vec![1, 2, 3, 4, 5, 6]).expect("frame");
        assert_eq!(frame.row(1), &[4, 5, 6]);
        assert_eq!(frame.rows().count(), 2);
    }
}
