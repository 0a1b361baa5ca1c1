//! Named matrix containers for expression data and gene networks.
//!
//! - `ExpressionMatrix`: dense genes × samples matrix with row (gene) and
//!   column (sample) names. Immutable input to the pipeline; smoothing always
//!   produces a new matrix of identical shape and naming.
//! - `SparseExpression`: the same contract over a `sprs` CSR/CSC matrix, for
//!   count data with heavy dropout.
//! - `AdjacencyMatrix`: square gene × gene prior network, rows and columns
//!   named by the same gene universe in the same order.
//! - `ExpressionInput`: representation tag used by the facade to dispatch on
//!   dense / sparse / chunked inputs explicitly rather than by dynamic type.
//!
//! Boundary validation lives here: squareness, name/shape agreement, and
//! rejection of any graph with a zero-sum row or column (for both axes,
//! regardless of which axis is later used for normalization).

use log::debug;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;
use sprs::CsMat;

use crate::chunked::ChunkedExpression;
use crate::error::{NetsmoothError, Result};

/// A dense, named gene × sample expression matrix.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    values: DenseMatrix<f64>,
    genes: Vec<String>,
    samples: Vec<String>,
}

impl ExpressionMatrix {
    /// Wrap a dense matrix with gene (row) and sample (column) names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the name vectors do not match the matrix
    /// shape or the matrix is empty.
    pub fn new(
        values: DenseMatrix<f64>,
        genes: Vec<String>,
        samples: Vec<String>,
    ) -> Result<Self> {
        let (n_genes, n_samples) = values.shape();
        if n_genes == 0 || n_samples == 0 {
            return Err(NetsmoothError::InvalidParameter(
                "expression matrix must be non-empty".into(),
            ));
        }
        if genes.len() != n_genes || samples.len() != n_samples {
            return Err(NetsmoothError::InvalidParameter(format!(
                "name/shape mismatch: {} gene names and {} sample names for a {}x{} matrix",
                genes.len(),
                samples.len(),
                n_genes,
                n_samples
            )));
        }
        debug!("ExpressionMatrix: {} genes x {} samples", n_genes, n_samples);
        Ok(Self { values, genes, samples })
    }

    /// Build from row vectors (one per gene).
    pub fn from_rows(
        rows: Vec<Vec<f64>>,
        genes: Vec<String>,
        samples: Vec<String>,
    ) -> Result<Self> {
        let n_genes = rows.len();
        let n_samples = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != n_samples) {
            return Err(NetsmoothError::InvalidParameter(
                "ragged rows in expression data".into(),
            ));
        }
        let values = DenseMatrix::from_iterator(
            rows.into_iter().flatten(),
            n_genes,
            n_samples,
            0,
        );
        Self::new(values, genes, samples)
    }

    /// Number of genes (rows).
    pub fn n_genes(&self) -> usize {
        self.values.shape().0
    }

    /// Number of samples (columns).
    pub fn n_samples(&self) -> usize {
        self.values.shape().1
    }

    /// Gene names, in row order.
    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    /// Sample names, in column order.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// The underlying dense matrix.
    pub fn values(&self) -> &DenseMatrix<f64> {
        &self.values
    }

    /// Value at (gene, sample).
    pub fn get(&self, gene: usize, sample: usize) -> f64 {
        *self.values.get((gene, sample))
    }

    /// Copy out the i-th gene row.
    pub fn gene_row(&self, i: usize) -> Vec<f64> {
        let n = self.n_samples();
        let mut row = Vec::with_capacity(n);
        for j in 0..n {
            row.push(*self.values.get((i, j)));
        }
        row
    }
}

/// A sparse gene × sample expression matrix (CSR or CSC).
#[derive(Debug, Clone)]
pub struct SparseExpression {
    values: CsMat<f64>,
    genes: Vec<String>,
    samples: Vec<String>,
}

impl SparseExpression {
    /// Wrap a sparse matrix with gene (row) and sample (column) names.
    pub fn new(values: CsMat<f64>, genes: Vec<String>, samples: Vec<String>) -> Result<Self> {
        let (n_genes, n_samples) = (values.rows(), values.cols());
        if n_genes == 0 || n_samples == 0 {
            return Err(NetsmoothError::InvalidParameter(
                "sparse expression matrix must be non-empty".into(),
            ));
        }
        if genes.len() != n_genes || samples.len() != n_samples {
            return Err(NetsmoothError::InvalidParameter(format!(
                "name/shape mismatch: {} gene names and {} sample names for a {}x{} matrix",
                genes.len(),
                samples.len(),
                n_genes,
                n_samples
            )));
        }
        debug!(
            "SparseExpression: {} genes x {} samples, {} stored entries",
            n_genes,
            n_samples,
            values.nnz()
        );
        Ok(Self { values, genes, samples })
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn values(&self) -> &CsMat<f64> {
        &self.values
    }

    /// Densify into an `ExpressionMatrix`. The diffusion kernel is dense, so
    /// sparse inputs go through this before projection.
    pub fn to_dense(&self) -> Result<ExpressionMatrix> {
        let (n_genes, n_samples) = (self.values.rows(), self.values.cols());
        let mut flat = vec![0.0; n_genes * n_samples];
        for (&v, (i, j)) in self.values.iter() {
            flat[i * n_samples + j] = v;
        }
        let dense = DenseMatrix::from_iterator(flat.into_iter(), n_genes, n_samples, 0);
        ExpressionMatrix::new(dense, self.genes.clone(), self.samples.clone())
    }
}

/// A square, named gene × gene adjacency matrix (the prior network).
///
/// Invariant enforced at construction: square shape and a gene-name vector of
/// matching length. Zero-sum rows/columns are checked separately by
/// [`AdjacencyMatrix::validate_degrees`] so the facade can reject them before
/// any computation is attempted.
#[derive(Debug, Clone)]
pub struct AdjacencyMatrix {
    values: DenseMatrix<f64>,
    genes: Vec<String>,
}

impl AdjacencyMatrix {
    /// Wrap a square matrix with its gene names.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGraph` if the matrix is not square, is empty, or the
    /// gene-name vector length does not match.
    pub fn new(values: DenseMatrix<f64>, genes: Vec<String>) -> Result<Self> {
        let (rows, cols) = values.shape();
        if rows == 0 {
            return Err(NetsmoothError::InvalidGraph(
                "adjacency matrix must be non-empty".into(),
            ));
        }
        if rows != cols {
            return Err(NetsmoothError::InvalidGraph(format!(
                "adjacency matrix must be square, got {}x{}",
                rows, cols
            )));
        }
        if genes.len() != rows {
            return Err(NetsmoothError::InvalidGraph(format!(
                "{} gene names for a {}x{} adjacency matrix",
                genes.len(),
                rows,
                cols
            )));
        }
        debug!("AdjacencyMatrix: {} genes", rows);
        Ok(Self { values, genes })
    }

    /// Build from row vectors.
    pub fn from_rows(rows: Vec<Vec<f64>>, genes: Vec<String>) -> Result<Self> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return Err(NetsmoothError::InvalidGraph(
                "adjacency rows must all have length equal to the gene count".into(),
            ));
        }
        let values = DenseMatrix::from_iterator(rows.into_iter().flatten(), n, n, 0);
        Self::new(values, genes)
    }

    /// Number of network genes.
    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    /// Gene names, in matrix order.
    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn values(&self) -> &DenseMatrix<f64> {
        &self.values
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        *self.values.get((i, j))
    }

    /// Reject any graph with a zero-sum row or column. A gene with no
    /// diffusion neighbors would break normalization, so this is checked for
    /// both axes regardless of which axis normalization will later use.
    pub fn validate_degrees(&self) -> Result<()> {
        let n = self.n_genes();
        for i in 0..n {
            let row_sum: f64 = (0..n).map(|j| *self.values.get((i, j))).sum();
            if row_sum == 0.0 {
                return Err(NetsmoothError::InvalidGraph(format!(
                    "gene '{}' has an all-zero adjacency row (no neighbors)",
                    self.genes[i]
                )));
            }
        }
        for j in 0..n {
            let col_sum: f64 = (0..n).map(|i| *self.values.get((i, j))).sum();
            if col_sum == 0.0 {
                return Err(NetsmoothError::InvalidGraph(format!(
                    "gene '{}' has an all-zero adjacency column (no neighbors)",
                    self.genes[j]
                )));
            }
        }
        Ok(())
    }

    /// Extract the square submatrix over the given gene indices, preserving
    /// their order. Used to restrict the network to measured genes before
    /// building the diffusion kernel.
    pub fn submatrix(&self, indices: &[usize]) -> DenseMatrix<f64> {
        let m = indices.len();
        let mut flat = Vec::with_capacity(m * m);
        for &i in indices {
            for &j in indices {
                flat.push(*self.values.get((i, j)));
            }
        }
        DenseMatrix::from_iterator(flat.into_iter(), m, m, 0)
    }
}

/// Input representation tag: the facade dispatches on this explicitly.
#[derive(Debug, Clone)]
pub enum ExpressionInput {
    /// Fully in-memory dense matrix; diffusion uses the direct solve.
    Dense(ExpressionMatrix),
    /// Sparse in-memory matrix; densified at projection, direct solve.
    Sparse(SparseExpression),
    /// Disk-backed store; diffusion streams fixed-size column chunks
    /// through a precomputed kernel.
    Chunked(ChunkedExpression),
}

impl ExpressionInput {
    /// Gene names of the wrapped representation.
    pub fn genes(&self) -> &[String] {
        match self {
            ExpressionInput::Dense(m) => m.genes(),
            ExpressionInput::Sparse(m) => m.genes(),
            ExpressionInput::Chunked(m) => m.genes(),
        }
    }

    /// Sample names of the wrapped representation.
    pub fn samples(&self) -> &[String] {
        match self {
            ExpressionInput::Dense(m) => m.samples(),
            ExpressionInput::Sparse(m) => m.samples(),
            ExpressionInput::Chunked(m) => m.samples(),
        }
    }

    /// (genes, samples) shape.
    pub fn shape(&self) -> (usize, usize) {
        (self.genes().len(), self.samples().len())
    }
}
