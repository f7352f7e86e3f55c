//! Pairwise color distance matrices.
//!
//! This module provides cdist-like functionality for computing dense matrices
//! of distances between target colors and candidate summary colors, using an
//! integer aggregation policy that is overflow-safe by construction:
//!
//! - `DistanceMode::Normalized` - per-channel absolute differences are
//!   floor-divided by the channel count before summation, so every entry is
//!   bounded by the maximum single-channel difference and fits a `u8`. This is
//!   the default, memory-efficient mode for large matrices.
//! - `DistanceMode::Raw` - unnormalized sum of absolute differences, stored in
//!   a `u16` to avoid overflow; preserves finer distinctions between near-tied
//!   candidates at the cost of memory.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::{Error, Result};

/// Aggregation policy for the distance matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMode {
    /// Sum of per-channel `|a - b| / channels` (floor division); fits `u8`.
    #[default]
    Normalized,
    /// Sum of per-channel `|a - b|`; needs `u16` to avoid overflow.
    Raw,
}

impl DistanceMode {
    /// Look up a distance mode by name, for callers holding user input.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "normalized" => Ok(DistanceMode::Normalized),
            "raw" => Ok(DistanceMode::Raw),
            _ => Err(Error::UnknownDistanceMode(name.to_string())),
        }
    }
}

/// Scalar type usable as a cost matrix entry.
///
/// Implemented for the two widths the aggregation policies produce. The
/// solvers are generic over this trait so both widths share one solve path.
pub trait CostScalar: nalgebra::Scalar + Copy + Ord {
    /// Maximum representable cost for this width.
    const MAX_COST: Self;

    /// Widen to `i64` for exact accumulation inside the solvers.
    fn to_i64(self) -> i64;
}

impl CostScalar for u8 {
    const MAX_COST: Self = u8::MAX;

    #[inline]
    fn to_i64(self) -> i64 {
        self as i64
    }
}

impl CostScalar for u16 {
    const MAX_COST: Self = u16::MAX;

    #[inline]
    fn to_i64(self) -> i64 {
        self as i64
    }
}

/// Dense cost matrix at the width chosen by the aggregation policy.
///
/// Rows are indexed by target-color index, columns by candidate-color index.
#[derive(Debug, Clone, PartialEq)]
pub enum CostMatrix {
    U8(DMatrix<u8>),
    U16(DMatrix<u16>),
}

impl CostMatrix {
    /// Number of target colors (rows).
    pub fn nrows(&self) -> usize {
        match self {
            CostMatrix::U8(m) => m.nrows(),
            CostMatrix::U16(m) => m.nrows(),
        }
    }

    /// Number of candidate colors (columns).
    pub fn ncols(&self) -> usize {
        match self {
            CostMatrix::U8(m) => m.ncols(),
            CostMatrix::U16(m) => m.ncols(),
        }
    }

    /// Entry (i, j) widened to `i64`, independent of storage width.
    pub fn cost(&self, i: usize, j: usize) -> i64 {
        match self {
            CostMatrix::U8(m) => m[(i, j)].to_i64(),
            CostMatrix::U16(m) => m[(i, j)].to_i64(),
        }
    }
}

/// Compute the pairwise distance matrix between two color tables.
///
/// # Arguments
/// * `x` - Target colors, one row per sample, one column per channel
/// * `y` - Candidate colors, same channel count as `x`
/// * `mode` - Aggregation policy (see [`DistanceMode`])
///
/// # Returns
/// A cost matrix of shape `(x.nrows(), y.nrows())` at the width the policy
/// requires. Entry (i, j) is the distance between target color i and
/// candidate color j.
///
/// # Errors
/// `Error::ChannelMismatch` if `x` and `y` disagree on channel count.
pub fn distance_matrix(x: &DMatrix<u8>, y: &DMatrix<u8>, mode: DistanceMode) -> Result<CostMatrix> {
    if x.ncols() != y.ncols() {
        return Err(Error::ChannelMismatch {
            targets: x.ncols(),
            candidates: y.ncols(),
        });
    }
    if x.ncols() == 0 {
        return Err(Error::InvalidConfig(
            "color tables must have at least one channel".to_string(),
        ));
    }

    let channels = x.ncols() as u16;
    match mode {
        DistanceMode::Normalized => Ok(CostMatrix::U8(fill(x, y, |x, y, i, j| {
            // Floor-dividing each channel term before summation bounds the
            // total by the single-channel maximum, so it fits a u8.
            let mut acc = 0u16;
            for c in 0..channels as usize {
                acc += x[(i, c)].abs_diff(y[(j, c)]) as u16 / channels;
            }
            acc as u8
        }))),
        DistanceMode::Raw => Ok(CostMatrix::U16(fill(x, y, |x, y, i, j| {
            let mut acc = 0u16;
            for c in 0..channels as usize {
                acc += x[(i, c)].abs_diff(y[(j, c)]) as u16;
            }
            acc
        }))),
    }
}

/// Fill the column-major backing buffer in parallel, one chunk per candidate.
///
/// The per-cell computation is a pure map from an index pair to a scalar, so
/// the columns are computed on the rayon pool with no shared mutable state.
fn fill<T, F>(x: &DMatrix<u8>, y: &DMatrix<u8>, cell: F) -> DMatrix<T>
where
    T: nalgebra::Scalar + Copy + Default + Send + Sync,
    F: Fn(&DMatrix<u8>, &DMatrix<u8>, usize, usize) -> T + Send + Sync,
{
    let nx = x.nrows();
    let ny = y.nrows();

    let mut data = vec![T::default(); nx * ny];
    data.par_chunks_mut(nx.max(1))
        .enumerate()
        .for_each(|(j, column)| {
            for (i, out) in column.iter_mut().enumerate() {
                *out = cell(x, y, i, j);
            }
        });

    // Column-major data: entry (i, j) lives at data[j * nx + i].
    DMatrix::from_vec(nx, ny, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== Normalized mode tests =====

    #[test]
    fn test_normalized_exact_values() {
        let x = DMatrix::from_row_slice(2, 3, &[10, 20, 30, 0, 0, 0]);
        let y = DMatrix::from_row_slice(2, 3, &[10, 20, 30, 13, 26, 39]);

        let d = match distance_matrix(&x, &y, DistanceMode::Normalized).unwrap() {
            CostMatrix::U8(m) => m,
            _ => panic!("normalized mode should produce a u8 matrix"),
        };

        // Row 0 vs col 0: identical colors -> 0
        assert_eq!(d[(0, 0)], 0);
        // Row 0 vs col 1: |10-13|/3 + |20-26|/3 + |30-39|/3 = 1 + 2 + 3 = 6
        assert_eq!(d[(0, 1)], 6);
        // Row 1 vs col 0: 10/3 + 20/3 + 30/3 = 3 + 6 + 10 = 19
        assert_eq!(d[(1, 0)], 19);
        // Row 1 vs col 1: 13/3 + 26/3 + 39/3 = 4 + 8 + 13 = 25
        assert_eq!(d[(1, 1)], 25);
    }

    #[test]
    fn test_normalized_bounded_at_extremes() {
        // Worst case for u8 channels: black vs white.
        let x = DMatrix::from_row_slice(1, 3, &[0, 0, 0]);
        let y = DMatrix::from_row_slice(1, 3, &[255, 255, 255]);

        let d = distance_matrix(&x, &y, DistanceMode::Normalized).unwrap();

        // 3 * (255 / 3) = 255: the maximum the mode can ever produce.
        assert_eq!(d.cost(0, 0), 255);
    }

    #[test]
    fn test_normalized_never_exceeds_channel_max() {
        // Exhaustive-ish sweep over extreme channel combinations.
        let corners: Vec<[u8; 3]> = vec![
            [0, 0, 0],
            [255, 255, 255],
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [128, 1, 254],
        ];
        let x = DMatrix::from_fn(corners.len(), 3, |i, c| corners[i][c]);
        let d = match distance_matrix(&x, &x, DistanceMode::Normalized).unwrap() {
            CostMatrix::U8(m) => m,
            _ => unreachable!(),
        };

        for v in d.iter() {
            assert!(*v <= 255);
        }
        // Diagonal is zero: identical colors.
        for i in 0..corners.len() {
            assert_eq!(d[(i, i)], 0);
        }
    }

    // ===== Raw mode tests =====

    #[test]
    fn test_raw_exact_values() {
        let x = DMatrix::from_row_slice(1, 3, &[10, 20, 30]);
        let y = DMatrix::from_row_slice(2, 3, &[10, 20, 30, 13, 26, 39]);

        let d = match distance_matrix(&x, &y, DistanceMode::Raw).unwrap() {
            CostMatrix::U16(m) => m,
            _ => panic!("raw mode should produce a u16 matrix"),
        };

        assert_eq!(d[(0, 0)], 0);
        // 3 + 6 + 9 = 18
        assert_eq!(d[(0, 1)], 18);
    }

    #[test]
    fn test_raw_maximum_fits_u16() {
        let x = DMatrix::from_row_slice(1, 3, &[0, 0, 0]);
        let y = DMatrix::from_row_slice(1, 3, &[255, 255, 255]);

        let d = distance_matrix(&x, &y, DistanceMode::Raw).unwrap();
        assert_eq!(d.cost(0, 0), 765);
    }

    #[test]
    fn test_raw_separates_near_ties() {
        // Two candidates that normalized mode cannot tell apart.
        let x = DMatrix::from_row_slice(1, 3, &[100, 100, 100]);
        let y = DMatrix::from_row_slice(2, 3, &[100, 100, 101, 100, 100, 102]);

        let normalized = distance_matrix(&x, &y, DistanceMode::Normalized).unwrap();
        assert_eq!(normalized.cost(0, 0), normalized.cost(0, 1)); // both floor to 0

        let raw = distance_matrix(&x, &y, DistanceMode::Raw).unwrap();
        assert!(raw.cost(0, 0) < raw.cost(0, 1));
    }

    // ===== Shape and mode lookup tests =====

    #[test]
    fn test_channel_mismatch_is_an_error() {
        let x = DMatrix::from_row_slice(1, 3, &[1, 2, 3]);
        let y = DMatrix::from_row_slice(1, 4, &[1, 2, 3, 4]);

        let err = distance_matrix(&x, &y, DistanceMode::Normalized).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ChannelMismatch {
                targets: 3,
                candidates: 4
            }
        ));
    }

    #[test]
    fn test_shape_of_result() {
        let x = DMatrix::from_fn(5, 3, |i, c| (i * 3 + c) as u8);
        let y = DMatrix::from_fn(7, 3, |i, c| (i + c) as u8);

        let d = distance_matrix(&x, &y, DistanceMode::Normalized).unwrap();
        assert_eq!(d.nrows(), 5);
        assert_eq!(d.ncols(), 7);
    }

    #[test]
    fn test_mode_from_name() {
        assert_eq!(
            DistanceMode::from_name("normalized").unwrap(),
            DistanceMode::Normalized
        );
        assert_eq!(DistanceMode::from_name("raw").unwrap(), DistanceMode::Raw);
        assert!(DistanceMode::from_name("euclidean").is_err());
    }
}
