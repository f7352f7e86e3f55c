//! Randomized batching for large assignment problems.
//!
//! A full solve over N targets and M candidates needs an N x M cost matrix
//! and, in exact mode, cubic time - infeasible beyond a few thousand on each
//! side. `solve_batched` partitions the rows into chunks after one random
//! permutation, pairs each chunk with a fresh random sample from the pool of
//! still-unused candidates, solves each sub-problem independently, and stitches
//! the local solutions into one global bijection.
//!
//! Candidates are re-sampled per batch rather than pre-partitioned: with
//! N << M only a fraction of the pool is ever used, and fresh sampling spreads
//! the best-matching candidates across batches instead of pre-allocating them
//! unevenly.
//!
//! Batches run strictly sequentially - each batch must observe the previous
//! batch's pool removals before sampling. All mutable state (the pool and the
//! solution buffer) is owned by one `solve_batched` call.

use log::debug;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::{solve_cost, AssignmentSolution, SolverMode};
use crate::distance::{distance_matrix, DistanceMode};
use crate::{Error, Result};

/// Configuration for one batched solve.
///
/// Together `x_batch_size` and `y_batch_size` bound the largest sub-problem
/// (and cost matrix) at `x_batch_size * y_batch_size` entries. Larger batches
/// expose more choices to the solver and raise mosaic quality, at the cost of
/// CPU and memory.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Max number of target rows per batch.
    pub x_batch_size: usize,
    /// Max number of candidates sampled for each batch; must be at least
    /// `x_batch_size` or no batch could form a local bijection.
    pub y_batch_size: usize,
    /// Solver strategy for each sub-problem.
    pub solver: SolverMode,
    /// Distance aggregation policy for each sub-matrix.
    pub distance: DistanceMode,
    /// RNG seed; `None` draws entropy, `Some` reproduces a run exactly.
    pub seed: Option<u64>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            x_batch_size: 256,
            y_batch_size: 8192,
            solver: SolverMode::Greedy,
            distance: DistanceMode::Normalized,
            seed: None,
        }
    }
}

impl BatchOptions {
    fn validate(&self, n: usize, m: usize) -> Result<()> {
        if self.x_batch_size == 0 || self.y_batch_size == 0 {
            return Err(Error::InvalidConfig(
                "batch sizes must be positive".to_string(),
            ));
        }
        if self.x_batch_size > self.y_batch_size {
            return Err(Error::BatchSizeOrder {
                x_batch_size: self.x_batch_size,
                y_batch_size: self.y_batch_size,
            });
        }
        if n > m {
            return Err(Error::NotEnoughCandidates {
                targets: n,
                candidates: m,
            });
        }
        Ok(())
    }
}

/// Solve a large assignment problem in randomized batches.
///
/// # Arguments
/// * `x` - Target colors (N x C)
/// * `y` - Candidate colors (M x C), N <= M
/// * `opts` - Batch sizes, solver and distance modes, seed
///
/// # Returns
/// A global bijection from all N row indices to N distinct column indices in
/// `{0..M-1}`, in original row order. Not globally optimal in general - each
/// batch is solved against only its own candidate sample - but every batch
/// respects the global one-to-one constraint.
///
/// # Errors
/// Configuration errors (zero or misordered batch sizes, N > M, channel
/// mismatch) are reported before any matrix is built. A failure inside any
/// sub-problem abandons the whole solve; no partial results are returned.
pub fn solve_batched(
    x: &DMatrix<u8>,
    y: &DMatrix<u8>,
    opts: &BatchOptions,
) -> Result<AssignmentSolution> {
    let n = x.nrows();
    let m = y.nrows();

    opts.validate(n, m)?;
    if x.ncols() != y.ncols() {
        return Err(Error::ChannelMismatch {
            targets: x.ncols(),
            candidates: y.ncols(),
        });
    }

    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // One permutation fixes how rows group into batches; the solution is
    // written through it, which restores original row order for free.
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(&mut rng);

    // Unused-candidate pool as a swap-remove arena: sampled entries move to
    // the front, consumed entries are swap-removed from their positions.
    let mut pool: Vec<usize> = (0..m).collect();

    let mut tgt_indices = vec![usize::MAX; n];
    let num_batches = n.div_ceil(opts.x_batch_size);

    for (batch_idx, chunk) in perm.chunks(opts.x_batch_size).enumerate() {
        let sample_len = opts.y_batch_size.min(pool.len());
        if sample_len < chunk.len() {
            // Unreachable given N <= M and monotonic pool shrinkage, but a
            // short final batch must never outgrow the remaining pool.
            return Err(Error::PoolExhausted {
                needed: chunk.len(),
                available: pool.len(),
            });
        }

        debug!(
            "solving assignment batch {}/{} ({} x {})",
            batch_idx + 1,
            num_batches,
            chunk.len(),
            sample_len,
        );

        // Partial Fisher-Yates: draw the batch's candidate sample, without
        // replacement, into pool[..sample_len].
        for t in 0..sample_len {
            let r = rng.gen_range(t..pool.len());
            pool.swap(t, r);
        }

        let x_batch = x.select_rows(chunk.iter());
        let y_batch = y.select_rows(pool[..sample_len].iter());

        let d = distance_matrix(&x_batch, &y_batch, opts.distance)?;
        let local = solve_cost(&d, opts.solver, &mut rng)?;

        // Translate local columns to global candidate indices and place them
        // at the chunk rows' original positions.
        for (local_row, local_col) in local.pairs() {
            tgt_indices[chunk[local_row]] = pool[local_col];
        }

        // Remove exactly the consumed entries. Descending position order
        // keeps the not-yet-removed positions stable under swap_remove.
        let mut consumed = local.tgt_indices;
        consumed.sort_unstable_by(|a, b| b.cmp(a));
        for pos in consumed {
            pool.swap_remove(pos);
        }
    }

    Ok(AssignmentSolution {
        src_indices: (0..n).collect(),
        tgt_indices,
    })
}
