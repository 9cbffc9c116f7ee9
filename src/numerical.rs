use nalgebra::DMatrix;
use serde::Deserialize;
use crate::domain::grid2d::{CellSize2D, Grid2D};

pub mod central;
pub mod donor_cell;
pub mod interpolate;

/// Selects the convective discretization from the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scheme {
    CentralDifferences,
    DonorCell { gamma: f64 },
}

impl Default for Scheme {
    fn default() -> Self {
        Scheme::CentralDifferences
    }
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::CentralDifferences => "central_differences",
            Scheme::DonorCell { .. } => "donor_cell",
        }
    }
}

/// Finite-difference operators of the momentum equations on the staggered grid.
///
/// All operators are evaluated at a face location: `(i, j)` refers to u(i, j)
/// for the u-equation terms and to v(i, j) for the v-equation terms. Callers
/// guarantee `1 <= i <= nx` and `1 <= j <= ny` so every stencil stays inside the
/// ghost layer.
///
/// Diffusive and pressure terms are shared by every scheme; only the
/// convective terms differ.
pub trait Discretization {
    fn cell_size(&self) -> CellSize2D;

    /// ∂(u²)/∂x at u(i, j)
    fn compute_du2_dx(&self, grid: &Grid2D, i: usize, j: usize) -> f64;
    /// ∂(uv)/∂y at u(i, j)
    fn compute_duv_dy(&self, grid: &Grid2D, i: usize, j: usize) -> f64;
    /// ∂(uv)/∂x at v(i, j)
    fn compute_duv_dx(&self, grid: &Grid2D, i: usize, j: usize) -> f64;
    /// ∂(v²)/∂y at v(i, j)
    fn compute_dv2_dy(&self, grid: &Grid2D, i: usize, j: usize) -> f64;

    fn compute_d2u_dx2(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        second_difference_x(&grid.u, i, j, self.cell_size().0)
    }

    fn compute_d2u_dy2(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        second_difference_y(&grid.u, i, j, self.cell_size().1)
    }

    fn compute_d2v_dx2(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        second_difference_x(&grid.v, i, j, self.cell_size().0)
    }

    fn compute_d2v_dy2(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        second_difference_y(&grid.v, i, j, self.cell_size().1)
    }

    /// Forward difference of p across the face u(i, j).
    fn compute_dp_dx(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        (grid.p[(i + 1, j)] - grid.p[(i, j)]) / self.cell_size().0
    }

    /// Forward difference of p across the face v(i, j).
    fn compute_dp_dy(&self, grid: &Grid2D, i: usize, j: usize) -> f64 {
        (grid.p[(i, j + 1)] - grid.p[(i, j)]) / self.cell_size().1
    }
}

pub fn second_difference_x(field: &DMatrix<f64>, i: usize, j: usize, dx: f64) -> f64 {
    (field[(i + 1, j)] - 2.0 * field[(i, j)] + field[(i - 1, j)]) / (dx * dx)
}

pub fn second_difference_y(field: &DMatrix<f64>, i: usize, j: usize, dy: f64) -> f64 {
    (field[(i, j + 1)] - 2.0 * field[(i, j)] + field[(i, j - 1)]) / (dy * dy)
}

/// Five-point Laplacian of a cell-centred field, built from the same second
/// differences the momentum equations use.
pub fn laplacian(field: &DMatrix<f64>, i: usize, j: usize, cell_size: CellSize2D) -> f64 {
    let CellSize2D(dx, dy) = cell_size;
    second_difference_x(field, i, j, dx) + second_difference_y(field, i, j, dy)
}

// Convective stencils, split into the central part and the upwind correction.
// Both return numerators; the caller divides by the spacing. Donor-cell blends
// them as `(central + gamma * upwind) / h`.

pub(crate) fn du2_dx_central(u: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let right = 0.5 * (u[(i, j)] + u[(i + 1, j)]);
    let left = 0.5 * (u[(i - 1, j)] + u[(i, j)]);
    right * right - left * left
}

pub(crate) fn du2_dx_upwind(u: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let right = 0.5 * (u[(i, j)] + u[(i + 1, j)]);
    let left = 0.5 * (u[(i - 1, j)] + u[(i, j)]);
    right.abs() * 0.5 * (u[(i, j)] - u[(i + 1, j)]) - left.abs() * 0.5 * (u[(i - 1, j)] - u[(i, j)])
}

pub(crate) fn duv_dy_central(u: &DMatrix<f64>, v: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let v_top = 0.5 * (v[(i, j)] + v[(i + 1, j)]);
    let v_bottom = 0.5 * (v[(i, j - 1)] + v[(i + 1, j - 1)]);
    let u_top = 0.5 * (u[(i, j)] + u[(i, j + 1)]);
    let u_bottom = 0.5 * (u[(i, j - 1)] + u[(i, j)]);
    v_top * u_top - v_bottom * u_bottom
}

pub(crate) fn duv_dy_upwind(u: &DMatrix<f64>, v: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let v_top = 0.5 * (v[(i, j)] + v[(i + 1, j)]);
    let v_bottom = 0.5 * (v[(i, j - 1)] + v[(i + 1, j - 1)]);
    v_top.abs() * 0.5 * (u[(i, j)] - u[(i, j + 1)]) - v_bottom.abs() * 0.5 * (u[(i, j - 1)] - u[(i, j)])
}

pub(crate) fn duv_dx_central(u: &DMatrix<f64>, v: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let u_right = 0.5 * (u[(i, j)] + u[(i, j + 1)]);
    let u_left = 0.5 * (u[(i - 1, j)] + u[(i - 1, j + 1)]);
    let v_right = 0.5 * (v[(i, j)] + v[(i + 1, j)]);
    let v_left = 0.5 * (v[(i - 1, j)] + v[(i, j)]);
    u_right * v_right - u_left * v_left
}

pub(crate) fn duv_dx_upwind(u: &DMatrix<f64>, v: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let u_right = 0.5 * (u[(i, j)] + u[(i, j + 1)]);
    let u_left = 0.5 * (u[(i - 1, j)] + u[(i - 1, j + 1)]);
    u_right.abs() * 0.5 * (v[(i, j)] - v[(i + 1, j)]) - u_left.abs() * 0.5 * (v[(i - 1, j)] - v[(i, j)])
}

pub(crate) fn dv2_dy_central(v: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let top = 0.5 * (v[(i, j)] + v[(i, j + 1)]);
    let bottom = 0.5 * (v[(i, j - 1)] + v[(i, j)]);
    top * top - bottom * bottom
}

pub(crate) fn dv2_dy_upwind(v: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let top = 0.5 * (v[(i, j)] + v[(i, j + 1)]);
    let bottom = 0.5 * (v[(i, j - 1)] + v[(i, j)]);
    top.abs() * 0.5 * (v[(i, j)] - v[(i, j + 1)]) - bottom.abs() * 0.5 * (v[(i, j - 1)] - v[(i, j)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_second_differences_of_quadratic() {
        // f = x^2 + 3 y^2 on unit spacing: f_xx = 2, f_yy = 6
        let f = DMatrix::from_fn(5, 5, |i, j| (i * i) as f64 + 3.0 * (j * j) as f64);
        assert_relative_eq!(second_difference_x(&f, 2, 2, 1.0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(second_difference_y(&f, 2, 2, 1.0), 6.0, epsilon = 1e-12);
        assert_relative_eq!(laplacian(&f, 2, 2, CellSize2D(1.0, 1.0)), 8.0, epsilon = 1e-12);
        // halving the spacing scales the stencil by 4
        assert_relative_eq!(laplacian(&f, 1, 3, CellSize2D(0.5, 0.5)), 32.0, epsilon = 1e-12);
    }

    #[test]
    fn test_upwind_correction_vanishes_for_uniform_flow() {
        let u = DMatrix::from_element(4, 4, 1.5);
        let v = DMatrix::from_element(4, 4, -0.5);
        assert_eq!(du2_dx_upwind(&u, 1, 1), 0.0);
        assert_eq!(duv_dy_upwind(&u, &v, 1, 1), 0.0);
        assert_eq!(duv_dx_upwind(&u, &v, 1, 1), 0.0);
        assert_eq!(dv2_dy_upwind(&v, 1, 1), 0.0);
        assert_eq!(du2_dx_central(&u, 1, 1), 0.0);
    }

    #[test]
    fn test_scheme_deserialize() {
        let central: Scheme = serde_json::from_str(r#"{ "type": "central_differences" }"#).unwrap();
        assert_eq!(central, Scheme::CentralDifferences);
        let donor: Scheme = serde_json::from_str(r#"{ "type": "donor_cell", "gamma": 0.5 }"#).unwrap();
        assert_eq!(donor, Scheme::DonorCell { gamma: 0.5 });
        assert_eq!(donor.name(), "donor_cell");
    }
}
