//! # Mosaic - Photomosaic Assignment Engine
//!
//! Rust port of the Mosaic Maker assignment engine.
//!
//! Turns a target image into a photomosaic: a grid of small patches, each
//! replaced by the closest-matching image drawn exactly once from a large
//! candidate pool, minimizing aggregate color error.
//!
//! ## Features
//!
//! - Overflow-safe integer color distance matrices (8-bit and 16-bit widths)
//! - Exact (Hungarian) and greedy-random assignment solvers
//! - Randomized batching that scales both solvers to tens of thousands of
//!   patches while keeping the assignment globally one-to-one
//! - Minimal mosaic assembly onto a pixel canvas
//!
//! ## Example
//!
//! ```rust,ignore
//! use mosaic_rs::{solve_batched, BatchOptions, DistanceMode, SolverMode};
//!
//! // x: target colors (N x 3), y: candidate summary colors (M x 3)
//! let opts = BatchOptions {
//!     x_batch_size: 256,
//!     y_batch_size: 8192,
//!     solver: SolverMode::Greedy,
//!     distance: DistanceMode::Normalized,
//!     seed: Some(42),
//! };
//! let solution = solve_batched(&x, &y, &opts)?;
//! ```

pub mod distance;
pub mod assignment;
pub mod mosaic;

// Re-exports for convenience
pub use distance::{distance_matrix, CostMatrix, CostScalar, DistanceMode};
pub use assignment::{solve, solve_cost, AssignmentSolution, SolverMode};
pub use assignment::batched::{solve_batched, BatchOptions};
pub use mosaic::{assemble, create_mosaic, GridShape, MosaicOptions};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur in the mosaic engine.
    ///
    /// All of these are configuration or precondition errors detected before
    /// any work begins; there is no partial-success mode and no retry path.
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Channel count mismatch: targets have {targets} channels, candidates have {candidates}")]
        ChannelMismatch { targets: usize, candidates: usize },

        #[error("Target batch size ({x_batch_size}) exceeds candidate batch size ({y_batch_size})")]
        BatchSizeOrder {
            x_batch_size: usize,
            y_batch_size: usize,
        },

        #[error("Not enough candidates: {targets} targets but only {candidates} candidates")]
        NotEnoughCandidates { targets: usize, candidates: usize },

        #[error("Candidate pool exhausted: batch needs {needed} candidates but only {available} remain")]
        PoolExhausted { needed: usize, available: usize },

        #[error("Invalid patch library: {0}")]
        InvalidPatches(String),

        #[error("Invalid solution: {0}")]
        InvalidSolution(String),

        #[error("Unknown distance mode: {0}")]
        UnknownDistanceMode(String),

        #[error("Unknown solver mode: {0}")]
        UnknownSolverMode(String),
    }

    /// Result type for mosaic engine operations.
    pub type Result<T> = std::result::Result<T, Error>;
}
