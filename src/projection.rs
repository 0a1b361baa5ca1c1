//! Gene-space projection between an expression matrix and a prior network.
//!
//! The diffusion kernel is built over the measured ∩ network gene
//! intersection only: network genes that were never measured are excluded
//! from the restricted adjacency, and measured genes absent from the network
//! are left out of the projection entirely and pass through recombination
//! untouched, element for element.

use std::collections::HashMap;

use log::{debug, info, warn};
use smartcore::linalg::basic::arrays::{Array, Array2, MutArray};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{NetsmoothError, Result};
use crate::matrix::{AdjacencyMatrix, ExpressionMatrix};

/// Index bookkeeping for a projection onto network gene space.
///
/// Both index vectors follow the adjacency matrix's gene ordering:
/// `expression_rows[k]` and `network_indices[k]` refer to the same gene.
#[derive(Debug, Clone)]
pub struct ProjectionIndex {
    /// Row indices into the expression matrix, one per intersection gene.
    pub expression_rows: Vec<usize>,
    /// Indices into the adjacency gene list, one per intersection gene.
    pub network_indices: Vec<usize>,
}

impl ProjectionIndex {
    /// Number of genes in the measured ∩ network intersection.
    pub fn len(&self) -> usize {
        self.expression_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expression_rows.is_empty()
    }
}

/// Compute the measured ∩ network intersection, ordered by the adjacency
/// matrix's gene ordering.
pub fn projection_index(
    expression_genes: &[String],
    adjacency: &AdjacencyMatrix,
) -> ProjectionIndex {
    let positions: HashMap<&str, usize> = expression_genes
        .iter()
        .enumerate()
        .map(|(i, g)| (g.as_str(), i))
        .collect();

    let mut expression_rows = Vec::new();
    let mut network_indices = Vec::new();
    for (net_idx, gene) in adjacency.genes().iter().enumerate() {
        if let Some(&row) = positions.get(gene.as_str()) {
            expression_rows.push(row);
            network_indices.push(net_idx);
        }
    }

    let dropped = expression_genes.len() - expression_rows.len();
    info!(
        "projection: {} of {} measured genes matched the network ({} pass through)",
        expression_rows.len(),
        expression_genes.len(),
        dropped
    );
    if expression_rows.is_empty() {
        warn!("no measured gene appears in the network; smoothing will be a no-op");
    }

    ProjectionIndex { expression_rows, network_indices }
}

/// Extract the projected sub-matrix (intersection genes × samples) from a
/// dense expression matrix, reordered to the adjacency gene ordering.
pub fn project(
    expression: &ExpressionMatrix,
    index: &ProjectionIndex,
) -> DenseMatrix<f64> {
    let n_samples = expression.n_samples();
    let m = index.len();
    let mut flat = Vec::with_capacity(m * n_samples);
    for &row in &index.expression_rows {
        for j in 0..n_samples {
            flat.push(expression.get(row, j));
        }
    }
    debug!("projected {}x{} sub-matrix", m, n_samples);
    DenseMatrix::from_iterator(flat.into_iter(), m, n_samples, 0)
}

/// Recombine smoothed projected values back into the original gene space.
///
/// Rows present in the projection are overwritten with smoothed values; all
/// other rows are copied unchanged. Row and column names are preserved
/// exactly.
pub fn recombine(
    original: &ExpressionMatrix,
    index: &ProjectionIndex,
    smoothed: &DenseMatrix<f64>,
) -> Result<ExpressionMatrix> {
    let (m, n_samples) = smoothed.shape();
    if m != index.len() || n_samples != original.n_samples() {
        return Err(NetsmoothError::Computation(format!(
            "smoothed projection is {}x{}, expected {}x{}",
            m,
            n_samples,
            index.len(),
            original.n_samples()
        )));
    }

    let mut values = original.values().clone();
    for (k, &row) in index.expression_rows.iter().enumerate() {
        for j in 0..n_samples {
            values.set((row, j), *smoothed.get((k, j)));
        }
    }
    ExpressionMatrix::new(
        values,
        original.genes().to_vec(),
        original.samples().to_vec(),
    )
}

/// Chunk-local recombination for the streaming strategy: overwrite the
/// projected rows of a full-gene column chunk with their smoothed values,
/// leaving pass-through rows as read from the input store.
pub fn merge_chunk(
    chunk: &DenseMatrix<f64>,
    index: &ProjectionIndex,
    smoothed: &DenseMatrix<f64>,
) -> DenseMatrix<f64> {
    let mut merged = chunk.clone();
    let (_, width) = smoothed.shape();
    for (k, &row) in index.expression_rows.iter().enumerate() {
        for j in 0..width {
            merged.set((row, j), *smoothed.get((k, j)));
        }
    }
    merged
}
