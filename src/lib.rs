//! # netsmooth
//!
//! Network-diffusion smoothing for gene × sample expression matrices.
//!
//! Noisy, sparse per-gene measurements (single-cell counts in particular)
//! are regularized toward values consistent with their neighbors in a prior
//! gene network (e.g. a protein-protein interaction graph) via a
//! random-walk-with-restart diffusion:
//!
//! ```text
//! smoothed = (1 - alpha) * (I - alpha * A_norm)^-1 * expression
//! ```
//!
//! where `A_norm` is the row- or column-normalized adjacency restricted to
//! the measured ∩ network gene intersection and `alpha ∈ (0,1)` controls the
//! smoothing strength. Genes absent from the network pass through untouched.
//!
//! ## Pipeline
//!
//! 1. **Validation** — square adjacency with matching names, no zero-sum
//!    rows/columns on either axis, alpha strictly inside (0,1).
//! 2. **Projection** — the expression matrix's gene axis is mapped onto the
//!    network's gene ordering; the kernel is built over the intersection.
//! 3. **Diffusion** — one LU solve for in-memory inputs, or a precomputed
//!    kernel streamed over fixed-size column chunks for disk-backed inputs.
//! 4. **Recombination** — smoothed rows overwrite their originals, all
//!    other rows are copied unchanged, names preserved exactly.
//! 5. **Alpha selection** (when not fixed) — a rayon-parallel grid search
//!    scores every candidate by cluster-robustness bootstrap or by the
//!    entropy of a 2-D embedding, with a deterministic lowest-alpha
//!    tie-break.
//!
//! ## Example
//!
//! ```ignore
//! use netsmooth::{smooth, ExpressionInput, SmoothingOptions};
//!
//! let options = SmoothingOptions::new().with_alpha(0.5);
//! let result = smooth(&ExpressionInput::Dense(expression), &adjacency, &options)?;
//! assert!(!result.alpha_selected);
//! ```

pub mod chunked;
pub mod diffusion;
pub mod error;
pub mod matrix;
pub mod normalize;
pub mod projection;
pub mod scoring;
pub mod selection;
pub mod smooth;

#[cfg(test)]
mod tests;

pub use chunked::{ChunkConfig, ChunkedExpression};
pub use error::{NetsmoothError, Result};
pub use matrix::{AdjacencyMatrix, ExpressionInput, ExpressionMatrix, SparseExpression};
pub use normalize::NormalizeAxis;
pub use scoring::{ClusterMethod, EmbeddingFlavor, ScoreMethod};
pub use selection::{select_alpha, AlphaSelection};
pub use smooth::{smooth, Alpha, SmoothedExpression, SmoothingOptions, SmoothingResult};
