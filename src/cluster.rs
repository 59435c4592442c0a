//! Greedy overlap merge of raw scan hits.
//!
//! Single left-to-right pass: each surviving detection, in list order, absorbs
//! every later detection that overlaps its *original* box enough, then is
//! replaced by the hit-weighted mean of its cluster or dropped if the cluster
//! is too thin. Finalised detections are never revisited, so the result
//! depends on input order; the scanner emits hits in scale/row/column order.
//!
//! Merging a merged list again is a no-op only when no two outputs overlap
//! by the same test. Two clusters whose first members were too far apart can
//! end with means close enough to merge on a second pass.
use crate::detector::{DetectError, MergeParams};
use crate::types::Detection;
use log::debug;

/// Merge `detections` in place. `params` is validated first; on error the
/// list is left untouched.
pub fn merge_detections(
    detections: &mut Vec<Detection>,
    params: &MergeParams,
) -> Result<(), DetectError> {
    params.validate().map_err(DetectError::InvalidParams)?;
    let input = detections.len();
    let mut absorbed = vec![false; input];
    let mut out = Vec::with_capacity(input);

    for i in 0..input {
        if absorbed[i] {
            continue;
        }
        let rep = detections[i];
        let rep_rect = rep.rect();
        let rep_area = rep_rect.area();

        let mut acc = Accumulator::new(&rep);
        for j in i + 1..input {
            if absorbed[j] {
                continue;
            }
            let other = &detections[j];
            let other_rect = other.rect();
            let cross = rep_rect.intersection_area(&other_rect);
            if cross > 0
                && cross as f64 * params.distance_factor > rep_area.min(other_rect.area()) as f64
            {
                acc.add(other);
                absorbed[j] = true;
            }
        }

        if acc.hits > i64::from(params.min_hits) {
            out.push(acc.mean());
        }
    }

    debug!(
        "merge: {} -> {} detections (factor={} min_hits={})",
        input,
        out.len(),
        params.distance_factor,
        params.min_hits
    );
    *detections = out;
    Ok(())
}

/// Owned variant of [`merge_detections`].
pub fn merged(
    mut detections: Vec<Detection>,
    params: &MergeParams,
) -> Result<Vec<Detection>, DetectError> {
    merge_detections(&mut detections, params)?;
    Ok(detections)
}

struct Accumulator {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
    hits: i64,
}

impl Accumulator {
    fn new(first: &Detection) -> Self {
        let mut acc = Self {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            hits: 0,
        };
        acc.add(first);
        acc
    }

    fn add(&mut self, d: &Detection) {
        let w = i64::from(d.hits.max(1));
        self.x += i64::from(d.x) * w;
        self.y += i64::from(d.y) * w;
        self.width += i64::from(d.width) * w;
        self.height += i64::from(d.height) * w;
        self.hits += w;
    }

    fn mean(&self) -> Detection {
        Detection {
            x: (self.x / self.hits) as i32,
            y: (self.y / self.hits) as i32,
            width: (self.width / self.hits) as i32,
            height: (self.height / self.hits) as i32,
            hits: self.hits.min(i64::from(u32::MAX)) as u32,
        }
    }
}
