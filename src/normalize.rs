//! Graph normalization for the diffusion operator.
//!
//! Scales an adjacency matrix so each row (or each column) sums to 1,
//! turning it into the transition matrix of a random walk. Pure and
//! deterministic; zero-sum rows/columns on the chosen axis are rejected
//! rather than silently handled.

use log::{debug, trace};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{NetsmoothError, Result};

/// Which axis of the adjacency matrix is scaled to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeAxis {
    /// Each row divided by its sum (in-degree view).
    Rows,
    /// Each column divided by its sum (out-degree view).
    Columns,
}

/// Normalize a square adjacency matrix along the given axis.
///
/// # Errors
///
/// Returns `InvalidGraph` if any sum along the chosen axis is zero. This can
/// happen even on a graph that passed full-matrix validation when the matrix
/// is a restriction to measured genes whose neighbors were all unmeasured.
pub fn normalize_adjacency(
    adjacency: &DenseMatrix<f64>,
    axis: NormalizeAxis,
) -> Result<DenseMatrix<f64>> {
    let (n, m) = adjacency.shape();
    debug_assert_eq!(n, m, "adjacency must be square");
    trace!("normalizing {}x{} adjacency along {:?}", n, m, axis);

    let mut flat = Vec::with_capacity(n * n);
    match axis {
        NormalizeAxis::Rows => {
            for i in 0..n {
                let sum: f64 = (0..n).map(|j| *adjacency.get((i, j))).sum();
                if sum == 0.0 {
                    return Err(NetsmoothError::InvalidGraph(format!(
                        "row {} sums to zero, cannot normalize",
                        i
                    )));
                }
                for j in 0..n {
                    flat.push(*adjacency.get((i, j)) / sum);
                }
            }
        }
        NormalizeAxis::Columns => {
            let mut col_sums = vec![0.0; n];
            for (j, col_sum) in col_sums.iter_mut().enumerate() {
                *col_sum = (0..n).map(|i| *adjacency.get((i, j))).sum();
                if *col_sum == 0.0 {
                    return Err(NetsmoothError::InvalidGraph(format!(
                        "column {} sums to zero, cannot normalize",
                        j
                    )));
                }
            }
            for i in 0..n {
                for j in 0..n {
                    flat.push(*adjacency.get((i, j)) / col_sums[j]);
                }
            }
        }
    }

    debug!("normalized {}x{} adjacency ({:?})", n, n, axis);
    Ok(DenseMatrix::from_iterator(flat.into_iter(), n, n, 0))
}
