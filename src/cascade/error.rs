use crate::types::{Rect, WindowSize};
use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading a cascade description.
///
/// Every variant is fatal: a cascade that fails to load is never handed to
/// the scanner in a degraded form.
#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("failed to open cascade {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read cascade stream: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse cascade table JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cascade stream ended while reading {field} (value #{position})")]
    UnexpectedEnd { field: &'static str, position: usize },
    #[error("invalid token {token:?} at value #{position}")]
    InvalidToken { token: String, position: usize },
    #[error("invalid {field} = {value} at value #{position}")]
    InvalidValue {
        field: &'static str,
        value: f64,
        position: usize,
    },
    #[error(
        "stage {stage} classifier {classifier} has {nodes} nodes; only single-node stumps are supported"
    )]
    NotStumpBased {
        stage: usize,
        classifier: usize,
        nodes: i64,
    },
    #[error("stage {stage} classifier {classifier} declares {count} rectangles; expected 2 or 3")]
    UnsupportedRectCount {
        stage: usize,
        classifier: usize,
        count: i64,
    },
    #[error("stage {stage} classifier {classifier} has rect {rect:?} outside the {}x{} window", window.width, window.height)]
    RectOutsideWindow {
        stage: usize,
        classifier: usize,
        rect: Rect,
        window: WindowSize,
    },
    #[error("stage {stage} links to {link} stage {target}, but the cascade has {stages} stages")]
    InvalidLink {
        stage: usize,
        link: &'static str,
        target: i64,
        stages: usize,
    },
    #[error("{count} unexpected values after the last stage")]
    TrailingTokens { count: usize },
}
