//! Positional reader shared by the text and flattened-table formats.
//!
//! Both formats carry the same values in the same order; they only differ in
//! how a value is obtained (whitespace token vs. array element) and in how
//! trailing data is treated.
use super::error::CascadeError;
use super::model::{Cascade, HaarFeature, Stage, WeakClassifier, WeightedRect};
use crate::types::{Rect, WindowSize};
use log::debug;

/// Source of cascade values in declaration order.
pub(crate) trait ValueStream {
    fn next_value(&mut self, field: &'static str) -> Result<f64, CascadeError>;

    /// Number of values consumed so far.
    fn position(&self) -> usize;

    /// Called once the last stage has been read.
    fn finish(&mut self) -> Result<(), CascadeError>;
}

/// Whitespace-separated text tokens.
pub(crate) struct TextValues<'a> {
    tokens: std::str::SplitWhitespace<'a>,
    consumed: usize,
}

impl<'a> TextValues<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            tokens: text.split_whitespace(),
            consumed: 0,
        }
    }
}

impl ValueStream for TextValues<'_> {
    fn next_value(&mut self, field: &'static str) -> Result<f64, CascadeError> {
        let position = self.consumed;
        let token = self
            .tokens
            .next()
            .ok_or(CascadeError::UnexpectedEnd { field, position })?;
        self.consumed += 1;
        let value = token.parse::<f64>().map_err(|_| CascadeError::InvalidToken {
            token: token.to_string(),
            position,
        })?;
        if !value.is_finite() {
            return Err(CascadeError::InvalidValue {
                field,
                value,
                position,
            });
        }
        Ok(value)
    }

    fn position(&self) -> usize {
        self.consumed
    }

    fn finish(&mut self) -> Result<(), CascadeError> {
        let count = self.tokens.by_ref().count();
        if count > 0 {
            return Err(CascadeError::TrailingTokens { count });
        }
        Ok(())
    }
}

/// Flattened numeric table. Embedded tables may be padded past the last
/// stage, so trailing values are ignored.
pub(crate) struct TableValues<'a> {
    values: &'a [f64],
    consumed: usize,
}

impl<'a> TableValues<'a> {
    pub fn new(values: &'a [f64]) -> Self {
        Self {
            values,
            consumed: 0,
        }
    }
}

impl ValueStream for TableValues<'_> {
    fn next_value(&mut self, field: &'static str) -> Result<f64, CascadeError> {
        let position = self.consumed;
        let v = *self
            .values
            .get(position)
            .ok_or(CascadeError::UnexpectedEnd { field, position })?;
        self.consumed += 1;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(CascadeError::InvalidValue {
                field,
                value: v,
                position,
            })
        }
    }

    fn position(&self) -> usize {
        self.consumed
    }

    fn finish(&mut self) -> Result<(), CascadeError> {
        let extra = self.values.len() - self.consumed;
        if extra > 0 {
            debug!("cascade table: ignoring {} trailing values", extra);
        }
        Ok(())
    }
}

fn next_int<S: ValueStream>(src: &mut S, field: &'static str) -> Result<i64, CascadeError> {
    let value = src.next_value(field)?;
    if value.fract() != 0.0 || value.abs() > i32::MAX as f64 {
        return Err(CascadeError::InvalidValue {
            field,
            value,
            position: src.position() - 1,
        });
    }
    Ok(value as i64)
}

fn next_count<S: ValueStream>(src: &mut S, field: &'static str) -> Result<usize, CascadeError> {
    let value = next_int(src, field)?;
    if value < 0 {
        return Err(CascadeError::InvalidValue {
            field,
            value: value as f64,
            position: src.position() - 1,
        });
    }
    Ok(value as usize)
}

fn next_extent<S: ValueStream>(src: &mut S, field: &'static str) -> Result<i32, CascadeError> {
    Ok(next_count(src, field)? as i32)
}

fn next_link<S: ValueStream>(
    src: &mut S,
    link: &'static str,
    stage: usize,
    stages: usize,
) -> Result<Option<usize>, CascadeError> {
    let target = next_int(src, link)?;
    match target {
        -1 => Ok(None),
        t if t >= 0 && (t as usize) < stages => Ok(Some(t as usize)),
        t => Err(CascadeError::InvalidLink {
            stage,
            link,
            target: t,
            stages,
        }),
    }
}

pub(crate) fn read_cascade<S: ValueStream>(src: &mut S) -> Result<Cascade, CascadeError> {
    let width = next_int(src, "window width")?;
    let height = next_int(src, "window height")?;
    for (field, v) in [("window width", width), ("window height", height)] {
        if v <= 0 {
            return Err(CascadeError::InvalidValue {
                field,
                value: v as f64,
                position: 0,
            });
        }
    }
    let window = WindowSize::new(width as i32, height as i32);

    let stage_count = next_count(src, "stage count")?;
    let mut stages = Vec::with_capacity(stage_count.min(1024));
    for stage_idx in 0..stage_count {
        let classifier_count = next_count(src, "classifier count")?;
        let mut classifiers = Vec::with_capacity(classifier_count.min(4096));
        for classifier_idx in 0..classifier_count {
            classifiers.push(read_classifier(src, window, stage_idx, classifier_idx)?);
        }
        let threshold = src.next_value("stage threshold")? as f32;
        let parent = next_link(src, "parent", stage_idx, stage_count)?;
        let next = next_link(src, "next", stage_idx, stage_count)?;
        stages.push(Stage::new(classifiers, threshold).with_links(parent, next));
    }
    src.finish()?;

    let cascade = Cascade::new(window, stages);
    let tilted = cascade
        .stages()
        .iter()
        .flat_map(|s| s.classifiers.iter())
        .filter(|c| c.feature.tilted)
        .count();
    debug!(
        "cascade loaded: window={}x{} stages={} classifiers={} tilted={} tree={}",
        window.width,
        window.height,
        cascade.stage_count(),
        cascade.classifier_count(),
        tilted,
        cascade.is_tree()
    );
    Ok(cascade)
}

fn read_classifier<S: ValueStream>(
    src: &mut S,
    window: WindowSize,
    stage: usize,
    classifier: usize,
) -> Result<WeakClassifier, CascadeError> {
    let nodes = next_int(src, "node count")?;
    if nodes != 1 {
        return Err(CascadeError::NotStumpBased {
            stage,
            classifier,
            nodes,
        });
    }
    let count = next_int(src, "rect count")?;
    if !(2..=3).contains(&count) {
        return Err(CascadeError::UnsupportedRectCount {
            stage,
            classifier,
            count,
        });
    }
    let mut rects = [WeightedRect::default(); 3];
    for slot in rects.iter_mut().take(count as usize) {
        let x = next_int(src, "rect x")? as i32;
        let y = next_int(src, "rect y")? as i32;
        let width = next_extent(src, "rect width")?;
        let height = next_extent(src, "rect height")?;
        let rect = Rect::new(x, y, width, height);
        if !inside_window(&rect, window) {
            return Err(CascadeError::RectOutsideWindow {
                stage,
                classifier,
                rect,
                window,
            });
        }
        let weight = src.next_value("rect weight")? as f32;
        *slot = WeightedRect { rect, weight };
    }
    let tilted = next_int(src, "tilted flag")? != 0;
    let threshold = src.next_value("classifier threshold")? as f32;
    let left = src.next_value("left value")? as f32;
    let right = src.next_value("right value")? as f32;

    let feature = if count == 2 {
        HaarFeature::two(rects[0], rects[1])
    } else {
        HaarFeature::three(rects[0], rects[1], rects[2])
    }
    .with_tilted(tilted);
    Ok(WeakClassifier::new(feature, threshold, left, right))
}

fn inside_window(r: &Rect, window: WindowSize) -> bool {
    r.x >= 0
        && r.y >= 0
        && i64::from(r.x) + i64::from(r.width) <= i64::from(window.width)
        && i64::from(r.y) + i64::from(r.height) <= i64::from(window.height)
}
