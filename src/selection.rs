//! Automatic restart-strength (alpha) selection over a candidate grid.
//!
//! For each alpha in the grid the full projector → diffusion → recombine
//! pipeline runs as an independent task on the rayon pool (started lazily on
//! first use and left running, per rayon's global-pool semantics). A second
//! parallel pass scores every candidate. Both passes are fail-fast: any
//! failing candidate fails the whole search, since silently dropping one
//! would distort the max-score selection.
//!
//! Tie-break is deterministic: candidates are compared in ascending grid
//! order with a strictly-greater test, so the lowest alpha achieving the
//! maximal score wins exact ties.
//!
//! Disk-backed candidates write their artifacts next to the requested output
//! path; losers are deleted by the orchestrating thread strictly after all
//! scores are known, and the winner is renamed to the requested location.

use log::{debug, info};
use rayon::prelude::*;

use crate::chunked::ChunkConfig;
use crate::error::{NetsmoothError, Result};
use crate::matrix::{AdjacencyMatrix, ExpressionInput};
use crate::normalize::NormalizeAxis;
use crate::scoring::{score, ScoringConfig};
use crate::smooth::{run_pipeline, SmoothedExpression};

/// Result of an alpha search: the winning smoothed expression, the chosen
/// alpha, and the full (alpha, score) landscape in grid order.
#[derive(Debug)]
pub struct AlphaSelection {
    pub expression: SmoothedExpression,
    pub alpha: f64,
    pub scores: Vec<(f64, f64)>,
}

/// Validate an alpha grid: non-empty, every value strictly inside (0,1).
pub fn validate_grid(grid: &[f64]) -> Result<()> {
    if grid.is_empty() {
        return Err(NetsmoothError::InvalidParameter(
            "alpha grid must not be empty".into(),
        ));
    }
    for &a in grid {
        if !(a > 0.0 && a < 1.0) {
            return Err(NetsmoothError::InvalidParameter(format!(
                "alpha grid value {} outside (0, 1)",
                a
            )));
        }
    }
    Ok(())
}

/// Run the smoothing pipeline for every alpha in `grid`, score each result,
/// and return the best-scoring output with the winning alpha.
///
/// The expression and adjacency inputs are read-only and shared by reference
/// across all parallel tasks; no task communicates with another.
pub fn select_alpha(
    input: &ExpressionInput,
    adjacency: &AdjacencyMatrix,
    grid: &[f64],
    axis: NormalizeAxis,
    scoring: &ScoringConfig,
    chunk: Option<&ChunkConfig>,
) -> Result<AlphaSelection> {
    validate_grid(grid)?;
    info!(
        "alpha search over {} candidates with {:?} scoring",
        grid.len(),
        scoring.method
    );

    // Per-candidate artifact paths for the disk-backed path. Each artifact
    // is exclusively owned by the task that creates it until the search
    // resolves a winner.
    let artifacts: Vec<Option<std::path::PathBuf>> = (0..grid.len())
        .map(|i| {
            chunk.map(|c| {
                let mut os = c.output.as_os_str().to_os_string();
                os.push(format!(".alpha{}.part", i));
                std::path::PathBuf::from(os)
            })
        })
        .collect();

    // First parallel pass: one pipeline run per candidate, fail-fast.
    let candidates: Vec<(f64, SmoothedExpression)> = grid
        .par_iter()
        .zip(artifacts.par_iter())
        .map(|(&alpha, artifact)| {
            run_pipeline(input, adjacency, alpha, axis, chunk, artifact.as_deref())
                .map(|expr| (alpha, expr))
        })
        .collect::<Result<Vec<_>>>()?;

    // Second parallel pass: score every candidate, fail-fast.
    let scores: Vec<f64> = candidates
        .par_iter()
        .map(|(_, expr)| {
            let matrix = expr.load()?;
            score(&matrix, scoring)
        })
        .collect::<Result<Vec<_>>>()?;

    for (&alpha, &s) in grid.iter().zip(scores.iter()) {
        debug!("candidate alpha={:.3}: score={:.6}", alpha, s);
    }

    // Deterministic strict-max scan in ascending grid order.
    let mut best_idx = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, &s) in scores.iter().enumerate() {
        if s > best_score {
            best_score = s;
            best_idx = i;
        }
    }

    // Cleanup happens on this thread only, after all scores are known, so
    // deletion can never race with an in-flight candidate read.
    let mut winner: Option<(f64, SmoothedExpression)> = None;
    for (i, (alpha, expr)) in candidates.into_iter().enumerate() {
        if i == best_idx {
            winner = Some((alpha, expr));
        } else if let SmoothedExpression::OnDisk(store) = expr {
            store.remove()?;
        }
    }
    let (alpha, expr) = winner.ok_or_else(|| {
        NetsmoothError::Computation("alpha search produced no winning candidate".into())
    })?;

    // Promote the winning artifact to the requested output location.
    let expression = match (expr, chunk) {
        (SmoothedExpression::OnDisk(store), Some(c)) => {
            SmoothedExpression::OnDisk(store.rename(&c.output)?)
        }
        (expr, _) => expr,
    };

    info!("selected alpha={:.3} with score={:.6}", alpha, best_score);
    Ok(AlphaSelection {
        expression,
        alpha,
        scores: grid.iter().copied().zip(scores).collect(),
    })
}
