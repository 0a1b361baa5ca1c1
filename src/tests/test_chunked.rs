//! On-disk chunked store: round trips, ranged reads, cleanup.

use std::path::PathBuf;

use smartcore::linalg::basic::arrays::Array;

use crate::chunked::ChunkedExpression;
use crate::error::NetsmoothError;
use crate::tests::small_expression;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("netsmooth_{}_{}", name, std::process::id()))
}

#[test]
fn test_round_trip_is_bit_exact() {
    let expr = small_expression(7, 5);
    let path = temp_path("round_trip");
    let store = ChunkedExpression::from_matrix(&path, &expr).unwrap();

    let loaded = store.to_matrix().unwrap();
    assert_eq!(loaded.genes(), expr.genes());
    assert_eq!(loaded.samples(), expr.samples());
    for i in 0..7 {
        for j in 0..5 {
            assert_eq!(loaded.get(i, j), expr.get(i, j));
        }
    }
    store.remove().unwrap();
}

#[test]
fn test_ranged_column_reads() {
    let expr = small_expression(4, 10);
    let path = temp_path("ranged_reads");
    let store = ChunkedExpression::from_matrix(&path, &expr).unwrap();

    let middle = store.read_columns(3, 4).unwrap();
    assert_eq!(middle.shape(), (4, 4));
    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(*middle.get((i, j)), expr.get(i, 3 + j));
        }
    }

    // The final chunk may be shorter.
    let tail = store.read_columns(8, 2).unwrap();
    assert_eq!(tail.shape(), (4, 2));

    store.remove().unwrap();
}

#[test]
fn test_out_of_bounds_read_rejected() {
    let expr = small_expression(3, 4);
    let path = temp_path("oob_read");
    let store = ChunkedExpression::from_matrix(&path, &expr).unwrap();

    let err = store.read_columns(2, 5).unwrap_err();
    assert!(matches!(err, NetsmoothError::InvalidParameter(_)));

    store.remove().unwrap();
}

#[test]
fn test_incremental_append_matches_bulk_write() {
    let expr = small_expression(5, 6);
    let bulk_path = temp_path("bulk");
    let inc_path = temp_path("incremental");

    let bulk = ChunkedExpression::from_matrix(&bulk_path, &expr).unwrap();
    let incremental = ChunkedExpression::create(
        &inc_path,
        expr.genes().to_vec(),
        expr.samples().to_vec(),
    )
    .unwrap();
    // Write the same payload two columns at a time via the bulk store.
    for start in (0..6).step_by(2) {
        let chunk = bulk.read_columns(start, 2).unwrap();
        incremental.append_columns(&chunk).unwrap();
    }

    let a = bulk.to_matrix().unwrap();
    let b = incremental.to_matrix().unwrap();
    for i in 0..5 {
        for j in 0..6 {
            assert_eq!(a.get(i, j), b.get(i, j));
        }
    }

    bulk.remove().unwrap();
    incremental.remove().unwrap();
}

#[test]
fn test_remove_deletes_backing_file() {
    let expr = small_expression(3, 3);
    let path = temp_path("remove");
    let store = ChunkedExpression::from_matrix(&path, &expr).unwrap();
    assert!(path.exists());
    store.remove().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_rename_moves_backing_file() {
    let expr = small_expression(3, 3);
    let path = temp_path("rename_src");
    let dest = temp_path("rename_dst");
    let store = ChunkedExpression::from_matrix(&path, &expr).unwrap();

    let store = store.rename(&dest).unwrap();
    assert!(!path.exists());
    assert!(dest.exists());
    assert_eq!(store.path(), dest.as_path());

    store.remove().unwrap();
}
