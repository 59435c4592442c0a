//! Boosted Haar cascade model and its two on-disk forms.
//!
//! Purpose
//! - Hold a trained detector as an immutable [`Cascade`]: ordered stages of
//!   single-node stumps over 2- or 3-rectangle Haar features.
//! - Load it from the whitespace text form or from a flattened numeric table
//!   (JSON array on disk), and write both forms back.
//!
//! Format (shared token order)
//! ```text
//! orig_width orig_height
//! stage_count
//!   classifier_count
//!     node_count rect_count (x y width height weight){rect_count}
//!     tilted threshold left right
//!   stage_threshold parent next
//! ```
//!
//! Notes
//! - Only `node_count == 1` is accepted; deeper trees fail with
//!   [`CascadeError::NotStumpBased`].
//! - Tilted features load but contribute nothing: their outputs are zeroed.
//! - `parent`/`next` are validated and kept for inspection; stages are always
//!   evaluated in order.
mod error;
mod model;
mod parse;
mod table;
mod text;

pub use error::CascadeError;
pub use model::{Cascade, HaarFeature, Stage, WeakClassifier, WeightedRect, MAX_FEATURE_RECTS};

use std::fs;
use std::path::Path;

impl Cascade {
    /// Load from disk. A `.json` file is read as a flattened table, anything
    /// else as the text form.
    pub fn load(path: &Path) -> Result<Cascade, CascadeError> {
        let contents = fs::read_to_string(path).map_err(|source| CascadeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let is_table = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_table {
            Self::from_table_json(&contents)
        } else {
            Self::from_text(&contents)
        }
    }
}
