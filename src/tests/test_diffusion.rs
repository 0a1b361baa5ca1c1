//! Diffusion operator properties: kernel stochasticity, the alpha → 0
//! boundary, and equivalence of the direct and kernel strategies.

use approx::assert_abs_diff_eq;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::diffusion::{diffuse_direct, diffusion_kernel};
use crate::normalize::{normalize_adjacency, NormalizeAxis};
use crate::projection::{project, projection_index};
use crate::tests::{gene_names, random_adjacency, ring_adjacency, small_expression};

fn dense_matmul(a: &DenseMatrix<f64>, b: &DenseMatrix<f64>) -> DenseMatrix<f64> {
    let (n, inner) = a.shape();
    let (_, k) = b.shape();
    let mut flat = vec![0.0; n * k];
    for i in 0..n {
        for l in 0..inner {
            for j in 0..k {
                flat[i * k + j] += a.get((i, l)) * b.get((l, j));
            }
        }
    }
    DenseMatrix::from_iterator(flat.into_iter(), n, k, 0)
}

#[test]
fn test_kernel_rows_sum_to_one() {
    // With a row-stochastic A_norm, (1-a)(I - aA)^-1 is row-stochastic too.
    let adj = random_adjacency(gene_names(10), 0.25, 3);
    let norm = normalize_adjacency(adj.values(), NormalizeAxis::Rows).unwrap();
    let kernel = diffusion_kernel(&norm, 0.5).unwrap();
    for i in 0..10 {
        let sum: f64 = (0..10).map(|j| *kernel.get((i, j))).sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-10);
    }
}

#[test]
fn test_small_alpha_approaches_identity() {
    let expr = small_expression(8, 5);
    let adj = ring_adjacency(gene_names(8));
    let index = projection_index(expr.genes(), &adj);
    let projected = project(&expr, &index);
    let norm = normalize_adjacency(adj.values(), NormalizeAxis::Rows).unwrap();

    let smoothed = diffuse_direct(&projected, &norm, 0.001).unwrap();
    for i in 0..8 {
        for j in 0..5 {
            assert_abs_diff_eq!(
                *smoothed.get((i, j)),
                *projected.get((i, j)),
                epsilon = 0.01
            );
        }
    }
}

#[test]
fn test_large_alpha_pulls_toward_neighbors() {
    // A strongly smoothed signal has lower variance across genes.
    let expr = small_expression(10, 4);
    let adj = ring_adjacency(gene_names(10));
    let index = projection_index(expr.genes(), &adj);
    let projected = project(&expr, &index);
    let norm = normalize_adjacency(adj.values(), NormalizeAxis::Rows).unwrap();

    let smoothed = diffuse_direct(&projected, &norm, 0.9).unwrap();

    let column_variance = |m: &DenseMatrix<f64>, j: usize| {
        let vals: Vec<f64> = (0..10).map(|i| *m.get((i, j))).collect();
        let mean = vals.iter().sum::<f64>() / vals.len() as f64;
        vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / vals.len() as f64
    };
    for j in 0..4 {
        assert!(column_variance(&smoothed, j) <= column_variance(&projected, j) + 1e-12);
    }
}

#[test]
fn test_direct_and_kernel_strategies_agree() {
    let expr = small_expression(12, 7);
    let adj = random_adjacency(gene_names(12), 0.3, 9);
    let index = projection_index(expr.genes(), &adj);
    let projected = project(&expr, &index);
    let norm = normalize_adjacency(adj.values(), NormalizeAxis::Rows).unwrap();
    let alpha = 0.4;

    let direct = diffuse_direct(&projected, &norm, alpha).unwrap();
    let kernel = diffusion_kernel(&norm, alpha).unwrap();
    let via_kernel = dense_matmul(&kernel, &projected);

    for i in 0..12 {
        for j in 0..7 {
            let d = *direct.get((i, j));
            let k = *via_kernel.get((i, j));
            assert!(
                (d - k).abs() <= 1e-8 * d.abs().max(1.0),
                "strategy mismatch at ({}, {}): {} vs {}",
                i,
                j,
                d,
                k
            );
        }
    }
}

#[test]
fn test_direct_solve_satisfies_walk_system() {
    // The solved result must satisfy (I - a*A) * smoothed = (1-a) * projection.
    let expr = small_expression(8, 4);
    let adj = random_adjacency(gene_names(8), 0.3, 15);
    let index = projection_index(expr.genes(), &adj);
    let projected = project(&expr, &index);
    let norm = normalize_adjacency(adj.values(), NormalizeAxis::Rows).unwrap();
    let alpha = 0.5;

    let smoothed = diffuse_direct(&projected, &norm, alpha).unwrap();
    let walked = dense_matmul(&norm, &smoothed);
    for i in 0..8 {
        for j in 0..4 {
            let lhs = *smoothed.get((i, j)) - alpha * *walked.get((i, j));
            let rhs = (1.0 - alpha) * *projected.get((i, j));
            assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_diffusion_preserves_column_mass() {
    // Column normalization makes the walk mass-preserving per sample.
    let expr = small_expression(9, 3);
    let adj = random_adjacency(gene_names(9), 0.3, 21);
    let index = projection_index(expr.genes(), &adj);
    let projected = project(&expr, &index);
    let norm = normalize_adjacency(adj.values(), NormalizeAxis::Columns).unwrap();

    let smoothed = diffuse_direct(&projected, &norm, 0.6).unwrap();
    for j in 0..3 {
        let before: f64 = (0..9).map(|i| *projected.get((i, j))).sum();
        let after: f64 = (0..9).map(|i| *smoothed.get((i, j))).sum();
        assert_abs_diff_eq!(before, after, epsilon = 1e-8);
    }
}
