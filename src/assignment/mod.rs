//! Assignment solvers for matching target colors to candidate colors.
//!
//! This module provides:
//! - `SolverMode` - enum selecting between the two interchangeable strategies
//! - `AssignmentSolution` - the (src_indices, tgt_indices) index pair
//! - `solve` - dispatch onto the exact or greedy solver for one cost matrix
//! - `batched` - the planner that scales the solvers to large problems

pub mod batched;
mod greedy;
mod hungarian;

use nalgebra::DMatrix;
use rand::rngs::StdRng;

use crate::distance::{CostMatrix, CostScalar};
use crate::{Error, Result};

/// Strategy for solving one assignment problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverMode {
    /// Hungarian / Jonker-Volgenant style exact minimum-cost matching.
    /// Deterministic; worst-case cubic in max(N, M). Keep batch sizes small
    /// enough that this stays tractable - that bound is the caller's job.
    Exact,
    /// Greedy matching over a uniformly random row order. Valid bijection,
    /// not necessarily optimal; quadratic time.
    #[default]
    Greedy,
}

impl SolverMode {
    /// Look up a solver mode by name.
    ///
    /// Accepts the original algorithm names (`jonker_volgenant`,
    /// `greedy_random`) as well as short aliases.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "jonker_volgenant" | "exact" => Ok(SolverMode::Exact),
            "greedy_random" | "greedy" => Ok(SolverMode::Greedy),
            _ => Err(Error::UnknownSolverMode(name.to_string())),
        }
    }
}

/// An assignment from row indices to distinct column indices.
///
/// `src_indices[k]` is matched to `tgt_indices[k]`; the two vectors always
/// have equal length and no column index repeats within one solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentSolution {
    /// Row (target) indices, one per assignment.
    pub src_indices: Vec<usize>,
    /// Column (candidate) indices paired with `src_indices`.
    pub tgt_indices: Vec<usize>,
}

impl AssignmentSolution {
    /// Number of assigned pairs.
    pub fn len(&self) -> usize {
        self.src_indices.len()
    }

    /// True if no pairs were assigned.
    pub fn is_empty(&self) -> bool {
        self.src_indices.is_empty()
    }

    /// Iterate over (row, column) pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.src_indices
            .iter()
            .copied()
            .zip(self.tgt_indices.iter().copied())
    }
}

/// Solve one assignment problem over a dense cost matrix.
///
/// Returns a bijection from all N rows to N distinct columns minimizing
/// (exactly or heuristically, per `mode`) the total cost. `src_indices` is
/// always `0..N` in order.
///
/// # Errors
/// `Error::NotEnoughCandidates` if the matrix has more rows than columns -
/// no valid bijection can exist.
pub fn solve<T: CostScalar>(
    d: &DMatrix<T>,
    mode: SolverMode,
    rng: &mut StdRng,
) -> Result<AssignmentSolution> {
    if d.nrows() > d.ncols() {
        return Err(Error::NotEnoughCandidates {
            targets: d.nrows(),
            candidates: d.ncols(),
        });
    }

    Ok(match mode {
        SolverMode::Exact => hungarian::solve(d),
        SolverMode::Greedy => greedy::solve(d, rng),
    })
}

/// Solve one assignment problem over a width-erased cost matrix.
///
/// Dispatches the `CostMatrix` variant once per call onto the generic solver.
pub fn solve_cost(
    d: &CostMatrix,
    mode: SolverMode,
    rng: &mut StdRng,
) -> Result<AssignmentSolution> {
    match d {
        CostMatrix::U8(m) => solve(m, mode, rng),
        CostMatrix::U16(m) => solve(m, mode, rng),
    }
}
