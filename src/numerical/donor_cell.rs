use crate::domain::grid2d::{CellSize2D, Grid2D};
use crate::error::ConfigurationError;
use super::{
    du2_dx_central, du2_dx_upwind, duv_dx_central, duv_dx_upwind, duv_dy_central, duv_dy_upwind,
    dv2_dy_central, dv2_dy_upwind, Discretization,
};

/// Blend of central differences and first-order upwinding.
///
/// `gamma = 0` reproduces [`CentralDifferences`](super::central::CentralDifferences)
/// exactly, `gamma = 1` is pure donor-cell. A common choice is
/// `gamma >= max(|u| dt / dx, |v| dt / dy)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DonorCell {
    cell_size: CellSize2D,
    gamma: f64,
}

impl DonorCell {
    pub fn new(cell_size: CellSize2D, gamma: f64) -> Result<Self, ConfigurationError> {
        if !(0.0..=1.0).contains(&gamma) {
            return Err(ConfigurationError::InvalidParameter(format!(
                "donor-cell gamma must be in [0, 1], got {}",
                gamma
            )));
        }
        Ok(Self { cell_size, gamma })
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Discretization for DonorCell {
    fn cell_size(&self) -> CellSize2D {
        self.cell_size
    }

    fn compute_du2_dx(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        (du2_dx_central(&grid.u, i, j) + self.gamma * du2_dx_upwind(&grid.u, i, j)) / self.cell_size.0
    }

    fn compute_duv_dy(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        (duv_dy_central(&grid.u, &grid.v, i, j) + self.gamma * duv_dy_upwind(&grid.u, &grid.v, i, j))
            / self.cell_size.1
    }

    fn compute_duv_dx(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        (duv_dx_central(&grid.u, &grid.v, i, j) + self.gamma * duv_dx_upwind(&grid.u, &grid.v, i, j))
            / self.cell_size.0
    }

    fn compute_dv2_dy(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        (dv2_dy_central(&grid.v, i, j) + self.gamma * dv2_dy_upwind(&grid.v, i, j)) / self.cell_size.1
    }
}
