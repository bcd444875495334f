//! Error types for roadscan.

use thiserror::Error;

/// Result alias for roadscan operations.
pub type RoadScanResult<T> = std::result::Result<T, RoadScanError>;

/// Errors that can occur when decoding or suppressing detections.
///
/// Rows below the confidence threshold, out-of-range class indices and
/// degenerate boxes are filtered silently and never surface here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoadScanError {
    /// The grid column count does not match `4 + 1 + num_classes`.
    #[error("grid has {got} columns, expected {expected} (4 box + 1 objectness + classes)")]
    ShapeMismatch { expected: usize, got: usize },
    /// The backing buffer is shorter than `rows * cols`.
    #[error("buffer too small: needed {needed} values, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A scalar parameter is outside its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    /// The label list has no entries.
    #[error("label list must contain at least one class")]
    EmptyLabels,
    /// Model metadata declares a class count that disagrees with its names.
    #[error("model info declares {num_classes} classes but lists {names} names")]
    ModelInfoMismatch { num_classes: usize, names: usize },
}
