mod test_chunked;
mod test_diffusion;
mod test_projection;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::matrix::{AdjacencyMatrix, ExpressionMatrix};

pub const TEST_SEED: u64 = 128;

pub fn gene_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("gene{}", i)).collect()
}

pub fn sample_names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("cell{}", i)).collect()
}

/// Small deterministic expression matrix with values of order 1.
pub fn small_expression(n_genes: usize, n_samples: usize) -> ExpressionMatrix {
    let rows: Vec<Vec<f64>> = (0..n_genes)
        .map(|i| {
            (0..n_samples)
                .map(|j| 1.0 + ((i * 7 + j * 3) % 11) as f64 / 10.0)
                .collect()
        })
        .collect();
    ExpressionMatrix::from_rows(rows, gene_names(n_genes), sample_names(n_samples))
        .unwrap()
}

/// Ring graph over the given genes: every gene linked to both neighbors.
/// No zero-sum rows or columns by construction.
pub fn ring_adjacency(genes: Vec<String>) -> AdjacencyMatrix {
    let n = genes.len();
    let mut rows = vec![vec![0.0; n]; n];
    for i in 0..n {
        rows[i][(i + 1) % n] = 1.0;
        rows[i][(i + n - 1) % n] = 1.0;
    }
    AdjacencyMatrix::from_rows(rows, genes).unwrap()
}

/// Symmetric random-edge graph over a ring backbone (the backbone keeps
/// every degree positive).
pub fn random_adjacency(genes: Vec<String>, edge_prob: f64, seed: u64) -> AdjacencyMatrix {
    let n = genes.len();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = vec![vec![0.0; n]; n];
    for i in 0..n {
        rows[i][(i + 1) % n] = 1.0;
        rows[i][(i + n - 1) % n] = 1.0;
        for j in (i + 1)..n {
            if rng.random::<f64>() < edge_prob {
                rows[i][j] = 1.0;
                rows[j][i] = 1.0;
            }
        }
    }
    AdjacencyMatrix::from_rows(rows, genes).unwrap()
}

/// Overdispersed synthetic counts with dropout, negative-binomial-like:
/// a log-normal per-gene mean mixed with an exponential per-cell draw.
pub fn synthetic_counts(n_genes: usize, n_samples: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n_genes)
        .map(|_| {
            let log_mean: f64 = StandardNormal.sample(&mut rng);
            let mean = log_mean.exp() * 4.0;
            (0..n_samples)
                .map(|_| {
                    if rng.random::<f64>() < 0.3 {
                        0.0
                    } else {
                        let u: f64 = rng.random();
                        (mean * -(1.0 - u).ln()).round()
                    }
                })
                .collect()
        })
        .collect()
}
