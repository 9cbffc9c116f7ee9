use crate::domain::grid2d::{CellSize2D, Grid2D};
use super::{du2_dx_central, duv_dx_central, duv_dy_central, dv2_dy_central, Discretization};

/// Second-order central differences for the convective terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CentralDifferences {
    cell_size: CellSize2D,
}

impl CentralDifferences {
    pub fn new(cell_size: CellSize2D) -> Self {
        Self { cell_size }
    }
}

impl Discretization for CentralDifferences {
    fn cell_size(&self) -> CellSize2D {
        self.cell_size
    }

    fn compute_du2_dx(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        du2_dx_central(&grid.u, i, j) / self.cell_size.0
    }

    fn compute_duv_dy(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        duv_dy_central(&grid.u, &grid.v, i, j) / self.cell_size.1
    }

    fn compute_duv_dx(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        duv_dx_central(&grid.u, &grid.v, i, j) / self.cell_size.0
    }

    fn compute_dv2_dy(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        dv2_dy_central(&grid.v, i, j) / self.cell_size.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid2d::GridDimensions2D;
    use approx::assert_relative_eq;

    fn linear_grid() -> Grid2D {
        // u = x on the u faces, v = y on the v faces, spacing 0.5
        let mut grid = Grid2D::new(GridDimensions2D(4, 4), CellSize2D(0.5, 0.5)).unwrap();
        grid.u = nalgebra::DMatrix::from_fn(6, 6, |i, _| 0.5 * i as f64);
        grid.v = nalgebra::DMatrix::from_fn(6, 6, |_, j| 0.5 * j as f64);
        grid.p = nalgebra::DMatrix::from_fn(6, 6, |i, j| 2.0 * i as f64 - j as f64);
        grid
    }

    #[test]
    fn test_convective_terms_of_linear_field() {
        let grid = linear_grid();
        let scheme = CentralDifferences::new(grid.cell_size);
        // d(x^2)/dx = 2x at u(2, 2), x = 1.0
        assert_relative_eq!(scheme.compute_du2_dx(&grid, 2, 2), 2.0, epsilon = 1e-12);
        // d(y^2)/dy = 2y at v(2, 3), y = 1.5
        assert_relative_eq!(scheme.compute_dv2_dy(&grid, 2, 3), 3.0, epsilon = 1e-12);
        // d(xy)/dy = x at u(3, 2)
        assert_relative_eq!(scheme.compute_duv_dy(&grid, 3, 2), 1.5, epsilon = 1e-12);
        // d(xy)/dx = y at v(2, 1)
        assert_relative_eq!(scheme.compute_duv_dx(&grid, 2, 1), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_diffusion_and_pressure_gradient() {
        let grid = linear_grid();
        let scheme = CentralDifferences::new(grid.cell_size);
        assert_relative_eq!(scheme.compute_d2u_dx2(&grid, 2, 2), 0.0, epsilon = 1e-12);
        assert_relative_eq!(scheme.compute_d2v_dy2(&grid, 2, 2), 0.0, epsilon = 1e-12);
        assert_relative_eq!(scheme.compute_dp_dx(&grid, 1, 1), 4.0, epsilon = 1e-12);
        assert_relative_eq!(scheme.compute_dp_dy(&grid, 1, 1), -2.0, epsilon = 1e-12);
    }
}
