//! Whitespace-separated text form of a cascade.
//!
//! Line breaks are cosmetic; the reader only sees a token stream. The writer
//! puts the window size and stage count on their own lines, one classifier
//! per line, and closes each stage with `threshold parent next`.
use super::error::CascadeError;
use super::model::Cascade;
use super::parse::{read_cascade, TextValues};
use std::fmt;
use std::io::{Read, Write};

impl Cascade {
    /// Parse the text form. Tokens left after the last stage are an error.
    pub fn from_text(text: &str) -> Result<Cascade, CascadeError> {
        read_cascade(&mut TextValues::new(text))
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Cascade, CascadeError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_text(&text)
    }

    /// Write the text form to `out`.
    pub fn write_text<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        write!(out, "{self}")
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

/// Text form. Weights and thresholds are printed as the exact decimal of
/// their `f32` value so the stream reloads bit-identically.
impl fmt::Display for Cascade {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let window = self.orig_window_size();
        writeln!(out, "{} {}", window.width, window.height)?;
        writeln!(out, "{}", self.stage_count())?;
        for stage in self.stages() {
            writeln!(out, "{}", stage.classifiers.len())?;
            for c in &stage.classifiers {
                let rects = c.feature.rects();
                write!(out, "1 {}", rects.len())?;
                for r in rects {
                    write!(
                        out,
                        " {} {} {} {} {}",
                        r.rect.x,
                        r.rect.y,
                        r.rect.width,
                        r.rect.height,
                        f64::from(r.weight)
                    )?;
                }
                writeln!(
                    out,
                    " {} {} {} {}",
                    u8::from(c.feature.tilted),
                    f64::from(c.threshold),
                    f64::from(c.left),
                    f64::from(c.right)
                )?;
            }
            writeln!(
                out,
                "{} {} {}",
                f64::from(stage.threshold),
                link_value(stage.parent),
                link_value(stage.next)
            )?;
        }
        Ok(())
    }
}

pub(crate) fn link_value(link: Option<usize>) -> i64 {
    link.map_or(-1, |i| i as i64)
}
