//! Mosaic assembly and color-table derivation.
//!
//! The thin consumer of the assignment engine: derive the target and
//! candidate color tables, and map a global solution plus a grid shape onto a
//! pixel canvas.
//!
//! The grid convention matters: target colors are flattened column-major
//! (tile row varies fastest), and `assemble` unravels solution row indices
//! with the same convention. The two must stay in lockstep or every tile
//! lands transposed.

use image::imageops::{self, FilterType};
use image::RgbImage;
use nalgebra::DMatrix;

use crate::assignment::batched::{solve_batched, BatchOptions};
use crate::assignment::AssignmentSolution;
use crate::{Error, Result};

/// Mosaic grid dimensions, in patch units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    /// Tiles along the horizontal axis.
    pub width: usize,
    /// Tiles along the vertical axis.
    pub height: usize,
}

impl GridShape {
    /// Total number of tiles (N of the assignment problem).
    pub fn num_tiles(&self) -> usize {
        self.width * self.height
    }
}

/// Options for [`create_mosaic`].
#[derive(Debug, Clone)]
pub struct MosaicOptions {
    /// Number of tiles along the target image's longest edge.
    pub resolution: usize,
    /// Batched-solve configuration.
    pub batch: BatchOptions,
}

impl Default for MosaicOptions {
    fn default() -> Self {
        Self {
            resolution: 96,
            batch: BatchOptions::default(),
        }
    }
}

/// Grid shape for a target image, given tiles along its longest edge.
///
/// The short edge scales proportionally (rounded to nearest, at least one
/// tile).
pub fn grid_for_resolution(target_w: u32, target_h: u32, resolution: usize) -> Result<GridShape> {
    if resolution == 0 {
        return Err(Error::InvalidConfig(
            "mosaic resolution must be positive".to_string(),
        ));
    }
    if target_w == 0 || target_h == 0 {
        return Err(Error::InvalidConfig(
            "target image must be non-empty".to_string(),
        ));
    }

    let scale = resolution as f64 / target_w.max(target_h) as f64;
    let width = ((target_w as f64 * scale).round() as usize).max(1);
    let height = ((target_h as f64 * scale).round() as usize).max(1);
    Ok(GridShape { width, height })
}

/// Flatten a (grid-sized) target image into an N x 3 color table.
///
/// Column-major order: flat index `r` maps to tile `(row = r % h, col = r / h)`.
pub fn target_colors(img: &RgbImage) -> DMatrix<u8> {
    let w = img.width() as usize;
    let h = img.height() as usize;

    DMatrix::from_fn(w * h, 3, |r, c| {
        let x = (r / h) as u32;
        let y = (r % h) as u32;
        img.get_pixel(x, y).0[c]
    })
}

/// Per-patch mean colors: the M x 3 candidate summary table.
///
/// Means are floor-divided, matching the integer truncation of the original
/// pipeline.
pub fn patch_mean_colors(patches: &[RgbImage]) -> Result<DMatrix<u8>> {
    let (pw, ph) = patch_dimensions(patches)?;
    let count = (pw as u64) * (ph as u64);

    let mut means = DMatrix::<u8>::zeros(patches.len(), 3);
    for (i, patch) in patches.iter().enumerate() {
        let mut sums = [0u64; 3];
        for pixel in patch.pixels() {
            for c in 0..3 {
                sums[c] += pixel.0[c] as u64;
            }
        }
        for c in 0..3 {
            means[(i, c)] = (sums[c] / count) as u8;
        }
    }
    Ok(means)
}

/// Compose the final mosaic canvas from a solved assignment.
///
/// # Arguments
/// * `patches` - Candidate images, all of one fixed size (W, H)
/// * `solution` - Global assignment; `src_indices` are tile indices in the
///   column-major grid convention, `tgt_indices` key into `patches`
/// * `grid` - Mosaic dimensions in patch units
///
/// # Returns
/// A canvas of `(grid.width * W) x (grid.height * H)` pixels with the patch
/// keyed by each pair's candidate index blitted at its tile offset.
pub fn assemble(
    patches: &[RgbImage],
    solution: &AssignmentSolution,
    grid: GridShape,
) -> Result<RgbImage> {
    let (pw, ph) = patch_dimensions(patches)?;

    if solution.len() != grid.num_tiles() {
        return Err(Error::InvalidSolution(format!(
            "solution has {} pairs but the grid has {} tiles",
            solution.len(),
            grid.num_tiles()
        )));
    }

    let mut canvas = RgbImage::new(grid.width as u32 * pw, grid.height as u32 * ph);
    for (src, tgt) in solution.pairs() {
        if src >= grid.num_tiles() {
            return Err(Error::InvalidSolution(format!(
                "tile index {} out of range for {} tiles",
                src,
                grid.num_tiles()
            )));
        }
        let patch = patches.get(tgt).ok_or_else(|| {
            Error::InvalidSolution(format!(
                "candidate index {} out of range for {} patches",
                tgt,
                patches.len()
            ))
        })?;

        // Column-major unravel: tile row varies fastest.
        let tile_col = (src / grid.height) as i64;
        let tile_row = (src % grid.height) as i64;
        imageops::replace(&mut canvas, patch, tile_col * pw as i64, tile_row * ph as i64);
    }
    Ok(canvas)
}

/// Build a photomosaic of `target` from a library of candidate patches.
///
/// Resizes the target to the grid implied by `opts.resolution`, derives both
/// color tables, runs the batched solve, and assembles the canvas.
///
/// # Errors
/// `Error::NotEnoughCandidates` when the library holds fewer patches than the
/// grid has tiles (reduce the resolution or supply a larger library), plus
/// any batched-solve configuration error.
pub fn create_mosaic(
    patches: &[RgbImage],
    target: &RgbImage,
    opts: &MosaicOptions,
) -> Result<RgbImage> {
    let grid = grid_for_resolution(target.width(), target.height(), opts.resolution)?;
    let n = grid.num_tiles();
    if patches.len() < n {
        return Err(Error::NotEnoughCandidates {
            targets: n,
            candidates: patches.len(),
        });
    }

    let resized = imageops::resize(
        target,
        grid.width as u32,
        grid.height as u32,
        FilterType::Triangle,
    );
    let x = target_colors(&resized);
    let y = patch_mean_colors(patches)?;

    let solution = solve_batched(&x, &y, &opts.batch)?;
    assemble(patches, &solution, grid)
}

/// Shared (W, H) of a non-empty, uniformly sized patch library.
fn patch_dimensions(patches: &[RgbImage]) -> Result<(u32, u32)> {
    let first = patches
        .first()
        .ok_or_else(|| Error::InvalidPatches("patch library is empty".to_string()))?;
    let (pw, ph) = (first.width(), first.height());
    if pw == 0 || ph == 0 {
        return Err(Error::InvalidPatches("patches must be non-empty".to_string()));
    }
    for (i, patch) in patches.iter().enumerate() {
        if patch.width() != pw || patch.height() != ph {
            return Err(Error::InvalidPatches(format!(
                "patch {} is {}x{}, expected {}x{}",
                i,
                patch.width(),
                patch.height(),
                pw,
                ph
            )));
        }
    }
    Ok((pw, ph))
}
