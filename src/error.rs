//! Error types for the coco-stream-eval library.

use thiserror::Error;

/// Result type for coco-stream-eval operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Error types that can occur while configuring, feeding, or querying the metric.
///
/// Classes without ground-truth positives are not errors: they show up as `-1`
/// entries in the result matrices.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Invalid threshold grid or facade configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A detection/ground-truth row has the wrong field count, or paired
    /// batches have different lengths.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Unrecognized compute mode.
    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    /// Invalid bounding box dimensions.
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    /// Class label that is not a non-negative integer.
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    /// A result filter selected nothing along one of the matrix axes.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
