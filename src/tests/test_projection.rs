//! Projection onto network gene space and lossless recombination.

use smartcore::linalg::basic::arrays::{Array, Array2, MutArray};

use crate::projection::{merge_chunk, project, projection_index, recombine};
use crate::tests::{ring_adjacency, sample_names, small_expression};

#[test]
fn test_index_follows_adjacency_order() {
    let expr = small_expression(6, 4);
    // Network carries genes 4, 2, 0 in that order plus one unmeasured gene.
    let adj = ring_adjacency(vec![
        "gene4".into(),
        "gene2".into(),
        "unmeasured".into(),
        "gene0".into(),
    ]);
    let index = projection_index(expr.genes(), &adj);

    assert_eq!(index.expression_rows, vec![4, 2, 0]);
    assert_eq!(index.network_indices, vec![0, 1, 3]);
}

#[test]
fn test_project_extracts_rows() {
    let expr = small_expression(5, 3);
    let adj = ring_adjacency(vec!["gene3".into(), "gene1".into(), "gene0".into()]);
    let index = projection_index(expr.genes(), &adj);
    let projected = project(&expr, &index);

    assert_eq!(projected.shape(), (3, 3));
    for j in 0..3 {
        assert_eq!(*projected.get((0, j)), expr.get(3, j));
        assert_eq!(*projected.get((1, j)), expr.get(1, j));
        assert_eq!(*projected.get((2, j)), expr.get(0, j));
    }
}

#[test]
fn test_recombine_overwrites_only_projected_rows() {
    let expr = small_expression(5, 3);
    let adj = ring_adjacency(vec!["gene1".into(), "gene3".into(), "gene4".into()]);
    let index = projection_index(expr.genes(), &adj);

    let mut projected = project(&expr, &index);
    let (rows, cols) = projected.shape();
    for i in 0..rows {
        for j in 0..cols {
            let v = *projected.get((i, j));
            projected.set((i, j), v + 100.0);
        }
    }

    let result = recombine(&expr, &index, &projected).unwrap();
    assert_eq!(result.genes(), expr.genes());
    assert_eq!(result.samples(), expr.samples());

    for j in 0..3 {
        // Pass-through rows are bit-identical.
        assert_eq!(result.get(0, j), expr.get(0, j));
        assert_eq!(result.get(2, j), expr.get(2, j));
        // Projected rows carry the smoothed values.
        assert_eq!(result.get(1, j), expr.get(1, j) + 100.0);
        assert_eq!(result.get(3, j), expr.get(3, j) + 100.0);
        assert_eq!(result.get(4, j), expr.get(4, j) + 100.0);
    }
}

#[test]
fn test_empty_intersection() {
    let expr = small_expression(4, 2);
    let adj = ring_adjacency(vec!["other1".into(), "other2".into(), "other3".into()]);
    let index = projection_index(expr.genes(), &adj);
    assert!(index.is_empty());
}

#[test]
fn test_merge_chunk_overwrites_projected_rows() {
    let expr = small_expression(4, 6);
    let adj = ring_adjacency(vec!["gene0".into(), "gene2".into(), "pad".into()]);
    let index = projection_index(expr.genes(), &adj);

    let chunk = expr.values().clone();
    let smoothed = smartcore::linalg::basic::matrix::DenseMatrix::from_iterator(
        std::iter::repeat(-1.0).take(2 * 6),
        2,
        6,
        0,
    );
    let merged = merge_chunk(&chunk, &index, &smoothed);

    for j in 0..6 {
        assert_eq!(*merged.get((0, j)), -1.0);
        assert_eq!(*merged.get((2, j)), -1.0);
        assert_eq!(*merged.get((1, j)), expr.get(1, j));
        assert_eq!(*merged.get((3, j)), expr.get(3, j));
    }
}

#[test]
fn test_names_never_change() {
    let expr = small_expression(6, 4);
    let adj = ring_adjacency(vec!["gene5".into(), "gene0".into(), "x".into()]);
    let index = projection_index(expr.genes(), &adj);
    let projected = project(&expr, &index);
    let result = recombine(&expr, &index, &projected).unwrap();

    assert_eq!(result.genes().to_vec(), expr.genes().to_vec());
    assert_eq!(result.samples().to_vec(), sample_names(4));
}
