use nalgebra::DMatrix;
use serde::Deserialize;
use tracing::{debug, warn};
use crate::boundary::apply::apply_pressure_boundaries;
use crate::boundary::bc2d::DomainBoundaries;
use crate::domain::grid2d::{CellSize2D, Grid2D};
use crate::domain::mask::Mask;
use crate::error::ConfigurationError;
use crate::numerical::laplacian;

/// Order in which fluid cells are visited during one relaxation sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepOrdering {
    /// Row by row from the bottom, left to right within a row.
    #[default]
    Lexicographic,
    /// All cells with even `i + j` first, then all cells with odd `i + j`.
    RedBlack,
}

/// Outcome of one pressure solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureReport {
    pub iterations: usize,
    pub residual: f64,
    pub converged: bool,
}

/// Non-fatal: the solver hit its iteration cap before reaching the tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceWarning {
    pub step: usize,
    pub time: f64,
    pub iterations: usize,
    pub residual: f64,
    pub epsilon: f64,
}

/// Successive over-relaxation for `∇²p = rhs` on the fluid cells of a mask.
///
/// `omega = 1` is plain Gauss-Seidel. The pressure field is used as the
/// initial guess, so consecutive time steps warm-start each other.
#[derive(Debug, Clone, PartialEq)]
pub struct PressureSolver {
    epsilon: f64,
    max_iterations: usize,
    omega: f64,
    ordering: SweepOrdering,
    residual: f64,
    iterations: usize,
}

impl PressureSolver {
    pub fn new(
        epsilon: f64,
        max_iterations: usize,
        omega: f64,
        ordering: SweepOrdering,
    ) -> Result<Self, ConfigurationError> {
        if !(epsilon > 0.0 && epsilon.is_finite()) {
            return Err(ConfigurationError::InvalidParameter(format!(
                "pressure tolerance must be positive, got {}",
                epsilon
            )));
        }
        if max_iterations == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "pressure solver needs at least one iteration".to_string(),
            ));
        }
        if !(omega > 0.0 && omega < 2.0) {
            return Err(ConfigurationError::InvalidParameter(format!(
                "relaxation factor must lie in (0, 2), got {}",
                omega
            )));
        }
        Ok(Self {
            epsilon,
            max_iterations,
            omega,
            ordering,
            residual: f64::INFINITY,
            iterations: 0,
        })
    }

    pub fn gauss_seidel(epsilon: f64, max_iterations: usize) -> Result<Self, ConfigurationError> {
        Self::new(epsilon, max_iterations, 1.0, SweepOrdering::Lexicographic)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    pub fn ordering(&self) -> SweepOrdering {
        self.ordering
    }

    /// Residual reached by the most recent [`solve`](Self::solve).
    pub fn last_residual(&self) -> f64 {
        self.residual
    }

    pub fn last_iterations(&self) -> usize {
        self.iterations
    }

    /// Iterates until the residual drops below `epsilon` or the iteration cap is hit.
    ///
    /// Pressure ghost cells are refreshed before every sweep and again before
    /// the residual is measured.
    pub fn solve(&mut self, grid: &mut Grid2D, mask: &Mask, boundaries: &DomainBoundaries) -> PressureReport {
        self.iterations = 0;
        apply_pressure_boundaries(&mut grid.p, mask, boundaries);
        self.residual = self.residual(grid, mask);

        while self.residual >= self.epsilon && self.iterations < self.max_iterations {
            self.sweep(grid, mask);
            apply_pressure_boundaries(&mut grid.p, mask, boundaries);
            self.residual = self.residual(grid, mask);
            self.iterations += 1;
        }

        let converged = self.residual < self.epsilon;
        if converged {
            debug!(iterations = self.iterations, residual = self.residual, "Pressure solve converged");
        } else {
            warn!(
                iterations = self.iterations,
                residual = self.residual,
                epsilon = self.epsilon,
                "Pressure solve stopped at the iteration cap"
            );
        }
        PressureReport {
            iterations: self.iterations,
            residual: self.residual,
            converged,
        }
    }

    /// One relaxation pass over the fluid cells. Ghost values are read as they are.
    pub fn sweep(&self, grid: &mut Grid2D, mask: &Mask) {
        let Grid2D { p, rhs, cell_size, .. } = grid;
        let (nx, ny) = (p.nrows() - 2, p.ncols() - 2);
        match self.ordering {
            SweepOrdering::Lexicographic => {
                for j in 1..=ny {
                    for i in 1..=nx {
                        if mask.is_fluid(i, j) {
                            self.relax(p, rhs, *cell_size, i, j);
                        }
                    }
                }
            }
            SweepOrdering::RedBlack => {
                for parity in 0..2 {
                    for j in 1..=ny {
                        for i in 1..=nx {
                            if (i + j) % 2 == parity && mask.is_fluid(i, j) {
                                self.relax(p, rhs, *cell_size, i, j);
                            }
                        }
                    }
                }
            }
        }
    }

    fn relax(&self, p: &mut DMatrix<f64>, rhs: &DMatrix<f64>, cell_size: CellSize2D, i: usize, j: usize) {
        let CellSize2D(dx, dy) = cell_size;
        let (dx2, dy2) = (dx * dx, dy * dy);
        let neighbours = (p[(i - 1, j)] + p[(i + 1, j)]) / dx2 + (p[(i, j - 1)] + p[(i, j + 1)]) / dy2;
        let gauss_seidel = (neighbours - rhs[(i, j)]) / (2.0 / dx2 + 2.0 / dy2);
        p[(i, j)] = (1.0 - self.omega) * p[(i, j)] + self.omega * gauss_seidel;
    }

    /// Root-mean-square of `∇²p - rhs` over the fluid cells only.
    pub fn residual(&self, grid: &Grid2D, mask: &Mask) -> f64 {
        let mut sum = 0.0;
        for j in 1..=grid.ny() {
            for i in 1..=grid.nx() {
                if mask.is_fluid(i, j) {
                    let r = laplacian(&grid.p, i, j, grid.cell_size) - grid.rhs[(i, j)];
                    sum += r * r;
                }
            }
        }
        (sum / mask.fluid_cell_count() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bitmap::Bitmap;
    use crate::domain::grid2d::GridDimensions2D;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Zero-mean cosine source that is compatible with all-Neumann boundaries.
    fn cosine_problem(n: usize) -> (Grid2D, Mask) {
        let h = 1.0 / n as f64;
        let dims = GridDimensions2D(n, n);
        let mut grid = Grid2D::new(dims, CellSize2D(h, h)).unwrap();
        for j in 1..=n {
            for i in 1..=n {
                let x = (i as f64 - 0.5) * h;
                let y = (j as f64 - 0.5) * h;
                grid.rhs[(i, j)] = (PI * x).cos() * (PI * y).cos();
            }
        }
        (grid, Mask::all_fluid(dims).unwrap())
    }

    #[test]
    fn test_constructor_validation() {
        assert!(PressureSolver::new(1e-6, 100, 1.5, SweepOrdering::RedBlack).is_ok());
        assert!(PressureSolver::new(0.0, 100, 1.5, SweepOrdering::Lexicographic).is_err());
        assert!(PressureSolver::new(1e-6, 0, 1.5, SweepOrdering::Lexicographic).is_err());
        assert!(PressureSolver::new(1e-6, 100, 2.0, SweepOrdering::Lexicographic).is_err());
        assert!(PressureSolver::new(1e-6, 100, 0.0, SweepOrdering::Lexicographic).is_err());
        let gs = PressureSolver::gauss_seidel(1e-6, 10).unwrap();
        assert_relative_eq!(gs.omega(), 1.0);
        assert_eq!(gs.ordering(), SweepOrdering::Lexicographic);
    }

    #[test]
    fn test_lexicographic_sweep_order() {
        let dims = GridDimensions2D(2, 1);
        let mut grid = Grid2D::new(dims, CellSize2D(1.0, 1.0)).unwrap();
        let mask = Mask::all_fluid(dims).unwrap();
        grid.rhs[(1, 1)] = 1.0;
        grid.rhs[(2, 1)] = -1.0;

        let solver = PressureSolver::gauss_seidel(1e-12, 1).unwrap();
        solver.sweep(&mut grid, &mask);

        // (1, 1) is updated first and its new value feeds (2, 1)
        assert_relative_eq!(grid.p[(1, 1)], -0.25, epsilon = 1e-15);
        assert_relative_eq!(grid.p[(2, 1)], 0.1875, epsilon = 1e-15);
    }

    #[test]
    fn test_red_black_sweep_order() {
        let dims = GridDimensions2D(3, 1);
        let mask = Mask::all_fluid(dims).unwrap();
        let mut grid = Grid2D::new(dims, CellSize2D(1.0, 1.0)).unwrap();
        grid.rhs[(1, 1)] = 1.0;
        grid.rhs[(3, 1)] = -1.0;
        let mut lexicographic = grid.clone();

        let red_black = PressureSolver::new(1e-12, 1, 1.0, SweepOrdering::RedBlack).unwrap();
        red_black.sweep(&mut grid, &mask);
        // even cells (1, 1) and (3, 1) see the old zero at (2, 1)
        assert_relative_eq!(grid.p[(1, 1)], -0.25, epsilon = 1e-15);
        assert_relative_eq!(grid.p[(3, 1)], 0.25, epsilon = 1e-15);
        assert_relative_eq!(grid.p[(2, 1)], 0.0, epsilon = 1e-15);

        PressureSolver::gauss_seidel(1e-12, 1).unwrap().sweep(&mut lexicographic, &mask);
        assert_relative_eq!(lexicographic.p[(2, 1)], -0.0625, epsilon = 1e-15);
        assert_relative_eq!(lexicographic.p[(3, 1)], 0.234375, epsilon = 1e-15);
    }

    #[test]
    fn test_sweep_skips_obstacles() {
        let bitmap = Bitmap::from_rows(&["....", ".##.", ".##.", "...."]).unwrap();
        let dims = GridDimensions2D(4, 4);
        let mask = Mask::from_bitmap(&bitmap, dims).unwrap();
        let mut grid = Grid2D::new(dims, CellSize2D(1.0, 1.0)).unwrap();
        grid.rhs.fill(1.0);
        grid.p[(2, 2)] = 7.0;
        PressureSolver::gauss_seidel(1e-12, 1).unwrap().sweep(&mut grid, &mask);
        assert_relative_eq!(grid.p[(2, 2)], 7.0);
        assert!(grid.p[(1, 1)] != 0.0);
    }

    #[test]
    fn test_residual_is_non_increasing() {
        for omega in [0.8, 1.0, 1.5] {
            let (mut grid, mask) = cosine_problem(16);
            let solver = PressureSolver::new(1e-12, 1, omega, SweepOrdering::Lexicographic).unwrap();
            apply_pressure_boundaries(&mut grid.p, &mask, &DomainBoundaries::default());
            let mut previous = solver.residual(&grid, &mask);
            for sweep in 0..200 {
                solver.sweep(&mut grid, &mask);
                apply_pressure_boundaries(&mut grid.p, &mask, &DomainBoundaries::default());
                let current = solver.residual(&grid, &mask);
                assert!(
                    current <= previous * (1.0 + 1e-12) + 1e-14,
                    "omega = {}: residual grew from {} to {} at sweep {}",
                    omega, previous, current, sweep
                );
                previous = current;
            }
        }
    }

    #[test]
    fn test_solve_converges_and_over_relaxation_helps() {
        let (mut gs_grid, mask) = cosine_problem(16);
        let mut sor_grid = gs_grid.clone();

        let mut gauss_seidel = PressureSolver::gauss_seidel(1e-6, 10_000).unwrap();
        let gs_report = gauss_seidel.solve(&mut gs_grid, &mask, &DomainBoundaries::default());
        assert!(gs_report.converged);
        assert!(gs_report.residual < 1e-6);

        let mut sor = PressureSolver::new(1e-6, 10_000, 1.7, SweepOrdering::Lexicographic).unwrap();
        let sor_report = sor.solve(&mut sor_grid, &mask, &DomainBoundaries::default());
        assert!(sor_report.converged);
        assert!(
            sor_report.iterations < gs_report.iterations,
            "SOR took {} iterations, Gauss-Seidel {}",
            sor_report.iterations, gs_report.iterations
        );
        assert_eq!(sor.last_iterations(), sor_report.iterations);
        assert_relative_eq!(sor.last_residual(), sor_report.residual);

        let mut red_black = PressureSolver::new(1e-6, 10_000, 1.7, SweepOrdering::RedBlack).unwrap();
        let (mut rb_grid, _) = cosine_problem(16);
        assert!(red_black.solve(&mut rb_grid, &mask, &DomainBoundaries::default()).converged);
    }

    #[test]
    fn test_solve_stops_at_iteration_cap() {
        let (mut grid, mask) = cosine_problem(16);
        let mut solver = PressureSolver::gauss_seidel(1e-12, 3).unwrap();
        let report = solver.solve(&mut grid, &mask, &DomainBoundaries::default());
        assert!(!report.converged);
        assert_eq!(report.iterations, 3);
    }

    #[test]
    fn test_already_converged_field_needs_no_iterations() {
        let (mut grid, mask) = cosine_problem(8);
        grid.rhs.fill(0.0);
        grid.p.fill(3.0);
        let mut solver = PressureSolver::gauss_seidel(1e-8, 100).unwrap();
        let report = solver.solve(&mut grid, &mask, &DomainBoundaries::default());
        assert!(report.converged);
        assert_eq!(report.iterations, 0);
        assert_relative_eq!(report.residual, 0.0, epsilon = 1e-12);
    }
}
