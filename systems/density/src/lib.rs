#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Uniform spatial grid tracking historical marker density.
//!
//! The grid covers the scene's bounding volume once at construction
//! and records how many markers were ever registered in each cell.
//! Counters only grow for the lifetime of a scene; there is no decay
//! or removal, so density scores bias selection toward progressively
//! less-visited areas over a session.

use echo_radar_core::SceneBounds;
use glam::Vec3;
use thiserror::Error;

/// Offsets of the cells sampled by [`DensityGrid::density_around`]:
/// the center cell plus its eight corner-diagonal neighbours. Face
/// and edge neighbours are intentionally not part of the stencil.
const STENCIL: [[i64; 3]; 9] = [
    [0, 0, 0],
    [-1, -1, -1],
    [-1, -1, 1],
    [-1, 1, -1],
    [-1, 1, 1],
    [1, -1, -1],
    [1, -1, 1],
    [1, 1, -1],
    [1, 1, 1],
];

/// Errors emitted when constructing a density grid.
#[derive(Debug, Error)]
pub enum DensityGridError {
    /// Indicates configuration values that cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Monotonic marker-count registry over a uniform 3D grid.
#[derive(Clone, Debug)]
pub struct DensityGrid {
    origin: Vec3,
    cell_size: f32,
    dimensions: [u32; 3],
    cells: Vec<u32>,
    total: u64,
}

impl DensityGrid {
    /// Builds a grid covering `bounds` with cubic cells of `cell_size`.
    ///
    /// Grid dimensions are derived once; every axis gets at least one
    /// cell so degenerate (flat) bounds still produce a usable grid.
    pub fn from_bounds(bounds: SceneBounds, cell_size: f32) -> Result<Self, DensityGridError> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(DensityGridError::InvalidConfig(
                "cell_size must be positive and finite",
            ));
        }

        let extent = bounds.extent();
        let mut dimensions = [0u32; 3];
        for (axis, length) in [extent.x, extent.y, extent.z].into_iter().enumerate() {
            if !length.is_finite() {
                return Err(DensityGridError::InvalidConfig("bounds must be finite"));
            }
            let cells = (length / cell_size).ceil() as u32;
            dimensions[axis] = cells.max(1);
        }

        let cell_count = dimensions.iter().map(|&d| d as usize).product();
        Ok(Self {
            origin: bounds.min(),
            cell_size,
            dimensions,
            cells: vec![0; cell_count],
            total: 0,
        })
    }

    /// Number of cells along each axis.
    #[must_use]
    pub const fn dimensions(&self) -> [u32; 3] {
        self.dimensions
    }

    /// Total number of markers ever registered.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Records one marker at `point`.
    ///
    /// Points outside the grid are clamped into the nearest boundary
    /// cell; registration never fails.
    pub fn register(&mut self, point: Vec3) {
        let [x, y, z] = self.cell_of(point);
        let index = self.flat_index(x, y, z);
        self.cells[index] = self.cells[index].saturating_add(1);
        self.total += 1;
    }

    /// Sums the counters of the cell containing `point` and its eight
    /// corner-diagonal neighbours.
    ///
    /// Neighbour offsets that fall outside the grid contribute
    /// nothing. The stencil deliberately skips face and edge
    /// neighbours; selection tuning depends on this exact coverage.
    #[must_use]
    pub fn density_around(&self, point: Vec3) -> u32 {
        let [x, y, z] = self.cell_of(point);
        let mut sum = 0u32;
        for offset in STENCIL {
            let nx = x as i64 + offset[0];
            let ny = y as i64 + offset[1];
            let nz = z as i64 + offset[2];
            if !self.in_range(nx, ny, nz) {
                continue;
            }
            let index = self.flat_index(nx as u32, ny as u32, nz as u32);
            sum = sum.saturating_add(self.cells[index]);
        }
        sum
    }

    fn cell_of(&self, point: Vec3) -> [u32; 3] {
        let local = (point - self.origin) / self.cell_size;
        let mut cell = [0u32; 3];
        for (axis, value) in [local.x, local.y, local.z].into_iter().enumerate() {
            let max_index = i64::from(self.dimensions[axis]) - 1;
            let raw = if value.is_finite() { value.floor() as i64 } else { 0 };
            cell[axis] = raw.clamp(0, max_index) as u32;
        }
        cell
    }

    fn in_range(&self, x: i64, y: i64, z: i64) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && x < i64::from(self.dimensions[0])
            && y < i64::from(self.dimensions[1])
            && z < i64::from(self.dimensions[2])
    }

    fn flat_index(&self, x: u32, y: u32, z: u32) -> usize {
        let columns = self.dimensions[0] as usize;
        let rows = self.dimensions[1] as usize;
        (z as usize * rows + y as usize) * columns + x as usize
    }
}
