//! Greedy-random assignment heuristic.
//!
//! Rows are processed in a uniformly random order; each row claims the
//! cheapest column that no earlier row has claimed. Random order avoids a
//! systematic bias toward low row indices grabbing the globally best columns,
//! at the price of strict determinism (seed the RNG to reproduce a run).
//!
//! The original formulation forbade a claimed column by overwriting its whole
//! matrix column with the maximum cost; here claimed columns live in an
//! explicit mask and are skipped during the row scan, so the caller's matrix
//! is never touched.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::AssignmentSolution;
use crate::distance::CostScalar;

/// Solve one assignment problem greedily.
///
/// Always returns a valid bijection for N <= M (enforced by the caller);
/// quadratic time, not necessarily optimal. On cost ties the lowest column
/// index wins.
pub(super) fn solve<T: CostScalar>(d: &DMatrix<T>, rng: &mut StdRng) -> AssignmentSolution {
    let n = d.nrows();
    let m = d.ncols();

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut used = vec![false; m];
    let mut tgt_indices = vec![0usize; n];

    for &i in &order {
        let mut best: Option<(usize, T)> = None;
        for j in 0..m {
            if used[j] {
                continue;
            }
            let c = d[(i, j)];
            match best {
                Some((_, bc)) if bc <= c => {}
                _ => best = Some((j, c)),
            }
        }
        // N <= M guarantees a free column for every row.
        let (j, _) = best.expect("free column available");
        used[j] = true;
        tgt_indices[i] = j;
    }

    AssignmentSolution {
        src_indices: (0..n).collect(),
        tgt_indices,
    }
}
