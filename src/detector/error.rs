use crate::integral::IntegralError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("integral image has no squared sums; build it with IntegralImage::build")]
    MissingSquares,
    #[error("invalid detector parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Integral(#[from] IntegralError),
}
