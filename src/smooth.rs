//! Facade: input validation, representation dispatch, and the `smooth`
//! entry point.
//!
//! Control flow: validate graph and alpha, then either run one fixed-alpha
//! pipeline (projector → diffusion → recombine) or hand off to the alpha
//! selector, which repeats that pipeline once per candidate strength in
//! parallel and scores each result.
//!
//! The chosen strategy is always observable: [`SmoothingResult`] reports the
//! alpha used, whether it was auto-selected, the embedding flavor resolved
//! for scoring, and the full score landscape of a search.

use std::path::Path;

use log::{debug, info, warn};

use crate::chunked::{ChunkConfig, ChunkedExpression};
use crate::diffusion::{diffuse_direct, diffusion_kernel, smooth_chunked_stream};
use crate::error::{NetsmoothError, Result};
use crate::matrix::{AdjacencyMatrix, ExpressionInput, ExpressionMatrix};
use crate::normalize::{normalize_adjacency, NormalizeAxis};
use crate::projection::{project, projection_index, recombine};
use crate::scoring::{ClusterMethod, EmbeddingFlavor, ScoreMethod, ScoringConfig};
use crate::selection::{select_alpha, validate_grid};

/// Diffusion strength: a concrete value in (0,1), or automatic grid search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alpha {
    Fixed(f64),
    Auto,
}

/// A smoothed expression matrix, in the representation the input dictated.
#[derive(Debug)]
pub enum SmoothedExpression {
    InMemory(ExpressionMatrix),
    OnDisk(ChunkedExpression),
}

impl SmoothedExpression {
    /// Load into memory (a clone for the in-memory variant, a full read for
    /// the on-disk one). Scoring goes through this.
    pub fn load(&self) -> Result<ExpressionMatrix> {
        match self {
            SmoothedExpression::InMemory(m) => Ok(m.clone()),
            SmoothedExpression::OnDisk(store) => store.to_matrix(),
        }
    }
}

/// Result of a smoothing call, with the resolved strategy reported.
#[derive(Debug)]
pub struct SmoothingResult {
    pub expression: SmoothedExpression,
    /// The alpha actually applied.
    pub alpha: f64,
    /// Whether alpha came from the automatic grid search.
    pub alpha_selected: bool,
    /// Embedding flavor used for scoring (None in fixed-alpha mode).
    pub flavor: Option<EmbeddingFlavor>,
    /// (alpha, score) per grid candidate (None in fixed-alpha mode).
    pub scores: Option<Vec<(f64, f64)>>,
}

/// Smoothing configuration with chainable builder methods.
///
/// Defaults: automatic alpha over 0.1..=0.9 in steps of 0.1, row
/// normalization, robustness scoring with k-means over 5 clusters and 10
/// bootstrap repeats, seed 128.
#[derive(Debug, Clone)]
pub struct SmoothingOptions {
    pub alpha: Alpha,
    pub axis: NormalizeAxis,
    pub grid: Vec<f64>,
    pub method: ScoreMethod,
    /// Embedding flavor for scoring; None means auto-detect from the data.
    pub flavor: Option<EmbeddingFlavor>,
    pub cluster_method: ClusterMethod,
    pub clusters: usize,
    pub repeats: usize,
    pub seed: u64,
    pub chunk: Option<ChunkConfig>,
}

impl Default for SmoothingOptions {
    fn default() -> Self {
        debug!("creating SmoothingOptions with default parameters");
        Self {
            alpha: Alpha::Auto,
            axis: NormalizeAxis::Rows,
            grid: (1..=9).map(|i| i as f64 / 10.0).collect(),
            method: ScoreMethod::Robustness,
            flavor: None,
            cluster_method: ClusterMethod::KMeans,
            clusters: 5,
            repeats: 10,
            seed: 128,
            chunk: None,
        }
    }
}

impl SmoothingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the diffusion strength instead of searching.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        info!("fixing alpha = {}", alpha);
        self.alpha = Alpha::Fixed(alpha);
        self
    }

    /// Search the given candidate grid automatically.
    pub fn with_alpha_grid(mut self, grid: Vec<f64>) -> Self {
        info!("auto alpha over {} candidates", grid.len());
        self.alpha = Alpha::Auto;
        self.grid = grid;
        self
    }

    pub fn with_axis(mut self, axis: NormalizeAxis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_score_method(mut self, method: ScoreMethod) -> Self {
        self.method = method;
        self
    }

    /// Pin the scoring embedding flavor instead of auto-detecting it.
    pub fn with_embedding(mut self, flavor: EmbeddingFlavor) -> Self {
        self.flavor = Some(flavor);
        self
    }

    pub fn with_cluster_method(mut self, method: ClusterMethod) -> Self {
        self.cluster_method = method;
        self
    }

    pub fn with_clusters(mut self, clusters: usize) -> Self {
        self.clusters = clusters;
        self
    }

    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable the out-of-core strategy (required for chunked inputs).
    pub fn with_chunking(mut self, chunk: ChunkConfig) -> Self {
        self.chunk = Some(chunk);
        self
    }
}

/// One projector → diffusion → recombine run at a fixed alpha. The execution
/// strategy follows the input representation: dense and sparse inputs use
/// the direct solve, chunked inputs stream through a precomputed kernel.
///
/// `artifact` overrides the output location for disk-backed candidates
/// during alpha selection.
pub(crate) fn run_pipeline(
    input: &ExpressionInput,
    adjacency: &AdjacencyMatrix,
    alpha: f64,
    axis: NormalizeAxis,
    chunk: Option<&ChunkConfig>,
    artifact: Option<&Path>,
) -> Result<SmoothedExpression> {
    let index = projection_index(input.genes(), adjacency);

    match input {
        ExpressionInput::Dense(matrix) => {
            smooth_in_memory(matrix, adjacency, &index, alpha, axis)
        }
        ExpressionInput::Sparse(sparse) => {
            let dense = sparse.to_dense()?;
            smooth_in_memory(&dense, adjacency, &index, alpha, axis)
        }
        ExpressionInput::Chunked(store) => {
            let cfg = chunk.ok_or_else(|| {
                NetsmoothError::InvalidParameter(
                    "chunked input requires a chunk size and output location".into(),
                )
            })?;
            if cfg.chunk_size == 0 {
                return Err(NetsmoothError::InvalidParameter(
                    "chunk size must be positive".into(),
                ));
            }
            if cfg.chunk_size > store.n_samples() {
                return Err(NetsmoothError::InvalidParameter(format!(
                    "chunk size {} exceeds sample count {}",
                    cfg.chunk_size,
                    store.n_samples()
                )));
            }
            let out_path = artifact.unwrap_or(&cfg.output);
            let output = ChunkedExpression::create(
                out_path,
                store.genes().to_vec(),
                store.samples().to_vec(),
            )?;

            if index.is_empty() {
                // Nothing to diffuse: stream an unmodified copy.
                let mut start = 0;
                while start < store.n_samples() {
                    let count = cfg.chunk_size.min(store.n_samples() - start);
                    output.append_columns(&store.read_columns(start, count)?)?;
                    start += count;
                }
                return Ok(SmoothedExpression::OnDisk(output));
            }

            let restricted = adjacency.submatrix(&index.network_indices);
            let normalized = normalize_adjacency(&restricted, axis)?;
            let kernel = diffusion_kernel(&normalized, alpha)?;
            smooth_chunked_stream(store, &output, &kernel, &index, cfg.chunk_size)?;
            Ok(SmoothedExpression::OnDisk(output))
        }
    }
}

fn smooth_in_memory(
    matrix: &ExpressionMatrix,
    adjacency: &AdjacencyMatrix,
    index: &crate::projection::ProjectionIndex,
    alpha: f64,
    axis: NormalizeAxis,
) -> Result<SmoothedExpression> {
    if index.is_empty() {
        return Ok(SmoothedExpression::InMemory(matrix.clone()));
    }
    let restricted = adjacency.submatrix(&index.network_indices);
    let normalized = normalize_adjacency(&restricted, axis)?;
    let projected = project(matrix, index);
    let smoothed = diffuse_direct(&projected, &normalized, alpha)?;
    let result = recombine(matrix, index, &smoothed)?;
    Ok(SmoothedExpression::InMemory(result))
}

/// Resolve the scoring embedding flavor when the caller did not pin one.
fn detect_flavor(input: &ExpressionInput) -> Result<EmbeddingFlavor> {
    match input {
        ExpressionInput::Dense(m) => Ok(EmbeddingFlavor::auto_detect(m)),
        // A sparse representation is itself the signal.
        ExpressionInput::Sparse(_) => {
            info!("sparse input: using Gaussian embedding for scoring");
            Ok(EmbeddingFlavor::Gaussian)
        }
        ExpressionInput::Chunked(store) => {
            let peek = store.n_samples().min(64);
            let values = store.read_columns(0, peek)?;
            let sample = ExpressionMatrix::new(
                values,
                store.genes().to_vec(),
                store.samples()[..peek].to_vec(),
            )?;
            Ok(EmbeddingFlavor::auto_detect(&sample))
        }
    }
}

/// Primary entry point: smooth an expression matrix over a prior network.
///
/// Validates all inputs at the boundary before any computation: the
/// adjacency must be square with non-empty names and no zero-sum row or
/// column on either axis; a fixed alpha must lie strictly inside (0,1); a
/// chunked input needs a positive chunk size no larger than the sample
/// count.
///
/// # Errors
///
/// `InvalidGraph`, `InvalidParameter`, or `Computation` per the conditions
/// above and in the diffusion/selection modules.
pub fn smooth(
    input: &ExpressionInput,
    adjacency: &AdjacencyMatrix,
    options: &SmoothingOptions,
) -> Result<SmoothingResult> {
    adjacency.validate_degrees()?;

    let (n_genes, n_samples) = input.shape();
    info!(
        "smoothing {} genes x {} samples over a {}-gene network",
        n_genes,
        n_samples,
        adjacency.n_genes()
    );

    match (&options.chunk, input) {
        (Some(cfg), ExpressionInput::Chunked(_)) => {
            if cfg.chunk_size == 0 {
                return Err(NetsmoothError::InvalidParameter(
                    "chunk size must be positive".into(),
                ));
            }
            if cfg.chunk_size > n_samples {
                return Err(NetsmoothError::InvalidParameter(format!(
                    "chunk size {} exceeds sample count {}",
                    cfg.chunk_size, n_samples
                )));
            }
        }
        (None, ExpressionInput::Chunked(_)) => {
            return Err(NetsmoothError::InvalidParameter(
                "chunked input requires chunking options (chunk size and output path)".into(),
            ));
        }
        (Some(_), _) => {
            warn!("chunking options ignored for an in-memory input");
        }
        (None, _) => {}
    }

    match options.alpha {
        Alpha::Fixed(alpha) => {
            if !(alpha > 0.0 && alpha < 1.0) {
                return Err(NetsmoothError::InvalidParameter(format!(
                    "alpha {} outside (0, 1)",
                    alpha
                )));
            }
            let expression = run_pipeline(
                input,
                adjacency,
                alpha,
                options.axis,
                options.chunk.as_ref(),
                None,
            )?;
            Ok(SmoothingResult {
                expression,
                alpha,
                alpha_selected: false,
                flavor: None,
                scores: None,
            })
        }
        Alpha::Auto => {
            validate_grid(&options.grid)?;
            if options.method == ScoreMethod::Robustness && options.clusters < 2 {
                return Err(NetsmoothError::InvalidParameter(
                    "robustness scoring needs at least 2 clusters".into(),
                ));
            }
            if options.repeats == 0 {
                return Err(NetsmoothError::InvalidParameter(
                    "bootstrap repeats must be positive".into(),
                ));
            }

            let flavor = match options.flavor {
                Some(f) => f,
                None => detect_flavor(input)?,
            };
            let scoring = ScoringConfig {
                method: options.method,
                flavor,
                cluster_method: options.cluster_method,
                clusters: options.clusters,
                repeats: options.repeats,
                seed: options.seed,
            };

            let selection = select_alpha(
                input,
                adjacency,
                &options.grid,
                options.axis,
                &scoring,
                options.chunk.as_ref(),
            )?;
            Ok(SmoothingResult {
                expression: selection.expression,
                alpha: selection.alpha,
                alpha_selected: true,
                flavor: Some(flavor),
                scores: Some(selection.scores),
            })
        }
    }
}
