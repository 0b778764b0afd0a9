//! Error taxonomy for the diagnostic core.
//!
//! Every variant is fatal for the alias being processed: the pipeline stops
//! and surfaces the error to the caller, other aliases in a batch are not
//! affected.

use thiserror::Error;

/// Result type for diagnostic operations.
pub type Result<T> = std::result::Result<T, DiagError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagError {
    /// An expected dimension is absent (or its coordinate has the wrong kind).
    #[error("dimension error: {0}")]
    Dimension(String),

    /// Array, coordinate or kernel sizes are incompatible.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Too few samples for a statistical estimator.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A join key in the data has no counterpart in the climatology.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),

    /// Configuration value out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unparseable time units or out-of-range dates.
    #[error("calendar error: {0}")]
    Calendar(String),
}
