//! Structured error types for the netsmooth pipeline.
//!
//! Every fallible boundary in the crate funnels into [`NetsmoothError`]:
//! graph validation failures, bad parameters, numerical failures inside the
//! kernel solve, and I/O from the chunked on-disk store.

use thiserror::Error;

/// Unified error type for all smoothing operations.
#[derive(Debug, Error)]
pub enum NetsmoothError {
    /// Adjacency matrix fails shape or zero-sum validation.
    /// Surfaced before any computation is attempted.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// Alpha out of range, unsupported axis/method, non-positive chunk size.
    /// Surfaced before any smoothing work begins.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Numerical failure, e.g. a near-singular (I - alpha * A) kernel solve.
    #[error("computation failed: {0}")]
    Computation(String),

    /// I/O error from the chunked expression store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetsmoothError>;
