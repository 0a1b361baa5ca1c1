//! Quality scoring for smoothed expression matrices.
//!
//! Two scoring strategies, both higher-is-better and deterministic under a
//! fixed seed:
//!
//! - **robustness**: embed samples into a low-dimensional space, cluster the
//!   embedding repeatedly under bootstrap perturbation, and report the
//!   fraction of samples consistently assigned to stable clusters across
//!   repeats. Clustering is pluggable: k-means (smartcore) or partition
//!   around medoids.
//! - **entropy**: embed samples into 2-D, discretize onto an occupancy grid,
//!   and report the Shannon entropy of the occupancy distribution.
//!   Over-smoothing collapses all samples into one region (low entropy);
//!   under-smoothing scatters noisy singletons. The alpha search seeks the
//!   middle ground.
//!
//! Embeddings are seeded random projections (Gaussian or sparse-sign): the
//! projection matrix is regenerated from the seed on the fly, so an
//! embedding costs 8 bytes of state instead of a stored genes × dims matrix.

use log::{debug, info, trace};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use smartcore::cluster::kmeans::{KMeans, KMeansParameters};
use smartcore::linalg::basic::arrays::Array2;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{NetsmoothError, Result};
use crate::matrix::ExpressionMatrix;

/// How a candidate smoothing result is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreMethod {
    /// Cluster-stability bootstrap.
    Robustness,
    /// Shannon entropy of a 2-D embedding occupancy grid.
    Entropy,
}

/// Random projection flavor used for the scoring embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingFlavor {
    /// Dense Gaussian projection: every output coordinate mixes all genes.
    /// The robust choice for sparse/count data with heavy dropout.
    Gaussian,
    /// Sparse-sign (Achlioptas) projection: entries in {-1, 0, +1} with
    /// probabilities {1/6, 2/3, 1/6}. Faster on dense continuous data.
    SparseSign,
}

impl EmbeddingFlavor {
    /// Pick a flavor from data characteristics: sparse or count-like data
    /// gets the Gaussian projection, everything else the sparse-sign one.
    /// The selector fixes this choice once for a whole alpha search.
    pub fn auto_detect(matrix: &ExpressionMatrix) -> Self {
        let (n_genes, n_samples) = (matrix.n_genes(), matrix.n_samples());
        let total = n_genes * n_samples;
        let mut zeros = 0usize;
        let mut count_like = true;
        for i in 0..n_genes {
            for j in 0..n_samples {
                let v = matrix.get(i, j);
                if v == 0.0 {
                    zeros += 1;
                }
                if v < 0.0 || v.fract() != 0.0 {
                    count_like = false;
                }
            }
        }
        let zero_frac = zeros as f64 / total as f64;
        let flavor = if zero_frac >= 0.3 || count_like {
            EmbeddingFlavor::Gaussian
        } else {
            EmbeddingFlavor::SparseSign
        };
        info!(
            "auto-detected embedding flavor {:?} (zero fraction {:.2}, count-like: {})",
            flavor, zero_frac, count_like
        );
        flavor
    }
}

/// Clustering primitive used by the robustness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterMethod {
    KMeans,
    /// Partition around medoids: seeded medoid initialization plus a
    /// bounded swap-improvement loop.
    Pam,
}

/// Scoring configuration, resolved by the facade before any candidate runs.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub method: ScoreMethod,
    pub flavor: EmbeddingFlavor,
    pub cluster_method: ClusterMethod,
    /// Cluster count for the robustness method.
    pub clusters: usize,
    /// Bootstrap repeats for the robustness method.
    pub repeats: usize,
    /// Seed for every internal random draw.
    pub seed: u64,
}

/// Project one sample's gene vector to `dims` coordinates, regenerating the
/// projection entries from the seed.
fn project_vector(x: &[f64], dims: usize, flavor: EmbeddingFlavor, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = vec![0.0; dims];
    match flavor {
        EmbeddingFlavor::Gaussian => {
            let scale = 1.0 / (dims as f64).sqrt();
            for &xi in x {
                for o in out.iter_mut() {
                    let sample: f64 = StandardNormal.sample(&mut rng);
                    *o += xi * sample * scale;
                }
            }
        }
        EmbeddingFlavor::SparseSign => {
            let scale = (3.0f64).sqrt() / (dims as f64).sqrt();
            for &xi in x {
                for o in out.iter_mut() {
                    let u: f64 = rng.random();
                    if u < 1.0 / 6.0 {
                        *o += xi * scale;
                    } else if u >= 5.0 / 6.0 {
                        *o -= xi * scale;
                    }
                }
            }
        }
    }
    out
}

/// Embed all samples (columns) of an expression matrix into `dims`
/// coordinates. Every sample shares the same seed, hence the same implicit
/// projection matrix.
pub fn embed_samples(
    matrix: &ExpressionMatrix,
    dims: usize,
    flavor: EmbeddingFlavor,
    seed: u64,
) -> Vec<Vec<f64>> {
    let (n_genes, n_samples) = (matrix.n_genes(), matrix.n_samples());
    debug!(
        "embedding {} samples from {} genes into {} dims ({:?})",
        n_samples, n_genes, dims, flavor
    );
    (0..n_samples)
        .map(|j| {
            let column: Vec<f64> = (0..n_genes).map(|i| matrix.get(i, j)).collect();
            project_vector(&column, dims, flavor, seed)
        })
        .collect()
}

/// K-means via smartcore's Lloyd implementation with an explicit seed.
pub fn kmeans_assign(
    points: &[Vec<f64>],
    k: usize,
    max_iter: usize,
    seed: u64,
) -> Result<Vec<usize>> {
    if points.is_empty() {
        return Ok(Vec::new());
    }
    let (n, f) = (points.len(), points[0].len());
    let k = k.min(n);

    let x: DenseMatrix<f64> =
        DenseMatrix::from_iterator(points.iter().flatten().copied(), n, f, 0);
    let params = KMeansParameters { k, max_iter, seed: Some(seed) };
    let km = KMeans::fit(&x, params)
        .map_err(|e| NetsmoothError::Computation(format!("k-means fit failed: {}", e)))?;
    km.predict(&x)
        .map_err(|e| NetsmoothError::Computation(format!("k-means predict failed: {}", e)))
}

fn squared_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Partition around medoids with seeded initialization and a bounded
/// medoid-update loop.
pub fn pam_assign(points: &[Vec<f64>], k: usize, max_iter: usize, seed: u64) -> Vec<usize> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    let k = k.min(n);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let mut medoids: Vec<usize> = indices[..k].to_vec();

    let mut assignments = vec![0usize; n];
    for _ in 0..max_iter {
        // Assignment step
        for (i, point) in points.iter().enumerate() {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for (c, &m) in medoids.iter().enumerate() {
                let d = squared_dist(point, &points[m]);
                if d < best_d {
                    best_d = d;
                    best = c;
                }
            }
            assignments[i] = best;
        }

        // Medoid update: the member minimizing total distance to its cluster
        let mut changed = false;
        for c in 0..k {
            let members: Vec<usize> =
                (0..n).filter(|&i| assignments[i] == c).collect();
            if members.is_empty() {
                continue;
            }
            let mut best_m = medoids[c];
            let mut best_cost = f64::INFINITY;
            for &cand in &members {
                let cost: f64 = members
                    .iter()
                    .map(|&other| squared_dist(&points[cand], &points[other]))
                    .sum();
                if cost < best_cost {
                    best_cost = cost;
                    best_m = cand;
                }
            }
            if best_m != medoids[c] {
                medoids[c] = best_m;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    assignments
}

fn cluster(
    points: &[Vec<f64>],
    method: ClusterMethod,
    k: usize,
    seed: u64,
) -> Result<Vec<usize>> {
    match method {
        ClusterMethod::KMeans => kmeans_assign(points, k, 50, seed),
        ClusterMethod::Pam => Ok(pam_assign(points, k, 50, seed)),
    }
}

/// Co-membership Jaccard between a sample's baseline cluster and its cluster
/// under a perturbed assignment.
fn comembership_jaccard(baseline: &[usize], perturbed: &[usize], sample: usize) -> f64 {
    let b = baseline[sample];
    let p = perturbed[sample];
    let mut intersection = 0usize;
    let mut union = 0usize;
    for i in 0..baseline.len() {
        let in_b = baseline[i] == b;
        let in_p = perturbed[i] == p;
        if in_b && in_p {
            intersection += 1;
        }
        if in_b || in_p {
            union += 1;
        }
    }
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Cluster-robustness bootstrap: fraction of samples whose cluster
/// membership stays consistent (co-membership Jaccard ≥ 0.5) across
/// perturbed re-clusterings of the embedding.
fn robustness_score(matrix: &ExpressionMatrix, cfg: &ScoringConfig) -> Result<f64> {
    let n_samples = matrix.n_samples();
    if n_samples < 3 {
        return Err(NetsmoothError::InvalidParameter(
            "robustness scoring needs at least 3 samples".into(),
        ));
    }
    let dims = matrix.n_genes().min(10).max(2);
    let points = embed_samples(matrix, dims, cfg.flavor, cfg.seed);
    let k = cfg.clusters.min(n_samples - 1).max(2);

    let baseline = cluster(&points, cfg.cluster_method, k, cfg.seed)?;

    let mut stable_fraction_sum = 0.0;
    for r in 0..cfg.repeats {
        // Bootstrap the embedding dimensions and re-cluster with a derived
        // seed; each repeat is an independent perturbation.
        let mut rng = ChaCha8Rng::seed_from_u64(cfg.seed.wrapping_add(1 + r as u64));
        let dim_sample: Vec<usize> =
            (0..dims).map(|_| rng.random_range(0..dims)).collect();
        let perturbed: Vec<Vec<f64>> = points
            .iter()
            .map(|p| dim_sample.iter().map(|&d| p[d]).collect())
            .collect();

        let assignment = cluster(
            &perturbed,
            cfg.cluster_method,
            k,
            cfg.seed.wrapping_add(1000 + r as u64),
        )?;

        let stable = (0..n_samples)
            .filter(|&i| comembership_jaccard(&baseline, &assignment, i) >= 0.5)
            .count();
        let fraction = stable as f64 / n_samples as f64;
        trace!("repeat {}: {}/{} samples stable", r, stable, n_samples);
        stable_fraction_sum += fraction;
    }

    let score = stable_fraction_sum / cfg.repeats.max(1) as f64;
    debug!("robustness score: {:.4}", score);
    Ok(score)
}

/// Side length of the entropy occupancy grid.
const ENTROPY_GRID: usize = 20;

/// Distributional entropy of a 2-D embedding: discretize onto a
/// `ENTROPY_GRID`-squared histogram over the bounding box and report the
/// Shannon entropy of the occupancy distribution (natural log).
fn entropy_score(matrix: &ExpressionMatrix, cfg: &ScoringConfig) -> Result<f64> {
    let points = embed_samples(matrix, 2, cfg.flavor, cfg.seed);
    let n = points.len();
    if n == 0 {
        return Err(NetsmoothError::InvalidParameter(
            "entropy scoring needs at least one sample".into(),
        ));
    }

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in &points {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    let span_x = (max_x - min_x).max(f64::MIN_POSITIVE);
    let span_y = (max_y - min_y).max(f64::MIN_POSITIVE);

    let mut counts = vec![0usize; ENTROPY_GRID * ENTROPY_GRID];
    for p in &points {
        let gx = (((p[0] - min_x) / span_x) * ENTROPY_GRID as f64) as usize;
        let gy = (((p[1] - min_y) / span_y) * ENTROPY_GRID as f64) as usize;
        let gx = gx.min(ENTROPY_GRID - 1);
        let gy = gy.min(ENTROPY_GRID - 1);
        counts[gx * ENTROPY_GRID + gy] += 1;
    }

    let mut entropy = 0.0;
    for &c in &counts {
        if c > 0 {
            let p = c as f64 / n as f64;
            entropy -= p * p.ln();
        }
    }
    debug!("entropy score: {:.4}", entropy);
    Ok(entropy)
}

/// Score a smoothed matrix with the configured method. Higher is better.
pub fn score(matrix: &ExpressionMatrix, cfg: &ScoringConfig) -> Result<f64> {
    match cfg.method {
        ScoreMethod::Robustness => robustness_score(matrix, cfg),
        ScoreMethod::Entropy => entropy_score(matrix, cfg),
    }
}
