use nalgebra::DMatrix;
use crate::error::ConfigurationError;
use crate::numerical::interpolate::{interpolate_u_at, interpolate_v_at};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDimensions2D(pub usize, pub usize); // nx, ny (interior cells)

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize2D(pub f64, pub f64); // dx, dy

/// Names of the arrays held by [`Grid2D`], used when reporting a bad value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U,
    V,
    P,
}

impl FieldKind {
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::U => "u",
            FieldKind::V => "v",
            FieldKind::P => "p",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Grid2D {
    pub dimensions: GridDimensions2D,
    pub cell_size: CellSize2D,
    pub u: DMatrix<f64>,   // (nx+2) x (ny+2), u(i, j) on the right face of cell (i, j)
    pub v: DMatrix<f64>,   // (nx+2) x (ny+2), v(i, j) on the top face of cell (i, j)
    pub p: DMatrix<f64>,   // (nx+2) x (ny+2), cell centres
    pub f: DMatrix<f64>,   // predictor for u
    pub g: DMatrix<f64>,   // predictor for v
    pub rhs: DMatrix<f64>, // pressure Poisson source
}

impl Grid2D {
    /// Every array carries one ghost layer, so interior cells are `1..=nx` by `1..=ny`.
    ///
    /// ```text
    ///  j=ny+1  ❖ - - - ❖ - - - ❖ - - - ❖
    ///          |       |       |       |
    ///          |   •   →   •   →   •   |
    ///          |       |       |       |
    ///          ❖ - ↑ - + - ↑ - + - ↑ - ❖
    ///          |       |       |       |
    ///  j=1     |   •   →   •   →   •   |
    ///          |       |       |       |
    ///  j=0     ❖ - ↑ - ❖ - ↑ - ❖ - ↑ - ❖
    ///            i=0     i=1    ...  i=nx+1
    /// ```
    /// `•` is p(i, j), `→` is u(i, j) and `↑` is v(i, j) of the cell to its left / below.
    pub fn new(dimensions: GridDimensions2D, cell_size: CellSize2D) -> Result<Self, ConfigurationError> {
        let GridDimensions2D(nx, ny) = dimensions;
        if nx < 1 || ny < 1 {
            return Err(ConfigurationError::InvalidGridSize(
                "Grid dimensions (nx, ny) must be at least 1x1 for interior cells.".to_string(),
            ));
        }
        let CellSize2D(dx, dy) = cell_size;
        if !(dx > 0.0 && dy > 0.0 && dx.is_finite() && dy.is_finite()) {
            return Err(ConfigurationError::InvalidGridSize(format!(
                "Cell size must be positive and finite, got dx = {}, dy = {}",
                dx, dy
            )));
        }
        let zeros = || DMatrix::<f64>::zeros(nx + 2, ny + 2);
        Ok(Self {
            dimensions,
            cell_size,
            u: zeros(),
            v: zeros(),
            p: zeros(),
            f: zeros(),
            g: zeros(),
            rhs: zeros(),
        })
    }

    pub fn nx(&self) -> usize {
        self.dimensions.0
    }

    pub fn ny(&self) -> usize {
        self.dimensions.1
    }

    pub fn dx(&self) -> f64 {
        self.cell_size.0
    }

    pub fn dy(&self) -> f64 {
        self.cell_size.1
    }

    /// Physical extent of the interior domain.
    pub fn physical_size(&self) -> (f64, f64) {
        (self.nx() as f64 * self.dx(), self.ny() as f64 * self.dy())
    }

    pub fn max_abs_u(&self) -> f64 {
        max_abs(&self.u)
    }

    pub fn max_abs_v(&self) -> f64 {
        max_abs(&self.v)
    }

    /// First entry of u, v or p that is non-finite or larger in magnitude than `limit`.
    pub fn find_invalid_value(&self, limit: f64) -> Option<(FieldKind, usize, usize, f64)> {
        for (kind, field) in [(FieldKind::U, &self.u), (FieldKind::V, &self.v), (FieldKind::P, &self.p)] {
            for j in 0..field.ncols() {
                for i in 0..field.nrows() {
                    let value = field[(i, j)];
                    if !value.is_finite() || value.abs() > limit {
                        return Some((kind, i, j, value));
                    }
                }
            }
        }
        None
    }

    /// Bilinear sample of u at a physical position inside the domain.
    pub fn interpolate_u(&self, x: f64, y: f64) -> f64 {
        interpolate_u_at(&self.u, self.dimensions, self.cell_size, x, y)
    }

    /// Bilinear sample of v at a physical position inside the domain.
    pub fn interpolate_v(&self, x: f64, y: f64) -> f64 {
        interpolate_v_at(&self.v, self.dimensions, self.cell_size, x, y)
    }

    pub fn velocity_at(&self, x: f64, y: f64) -> (f64, f64) {
        (self.interpolate_u(x, y), self.interpolate_v(x, y))
    }
}

pub fn max_abs(field: &DMatrix<f64>) -> f64 {
    field.iter().fold(0.0_f64, |acc, value| acc.max(value.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_creation() {
        let dims = GridDimensions2D(5, 4);
        let cell_size = CellSize2D(0.1, 0.2);
        let grid = Grid2D::new(dims, cell_size).unwrap();
        assert_eq!(grid.dimensions, dims);
        assert_eq!(grid.cell_size, cell_size);
        for field in [&grid.u, &grid.v, &grid.p, &grid.f, &grid.g, &grid.rhs] {
            assert_eq!(field.nrows(), 7);
            assert_eq!(field.ncols(), 6);
        }
        let (lx, ly) = grid.physical_size();
        assert_relative_eq!(lx, 0.5, epsilon = 1e-12);
        assert_relative_eq!(ly, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_grid_creation_invalid_size() {
        let cell_size = CellSize2D(0.1, 0.1);
        assert!(Grid2D::new(GridDimensions2D(0, 5), cell_size).is_err());
        assert!(Grid2D::new(GridDimensions2D(5, 0), cell_size).is_err());
        assert!(Grid2D::new(GridDimensions2D(5, 5), CellSize2D(0.0, 0.1)).is_err());
        assert!(Grid2D::new(GridDimensions2D(5, 5), CellSize2D(0.1, f64::NAN)).is_err());
    }

    #[test]
    fn test_max_abs_includes_negative_values() {
        let mut grid = Grid2D::new(GridDimensions2D(3, 3), CellSize2D(1.0, 1.0)).unwrap();
        grid.u[(2, 2)] = -4.0;
        grid.u[(1, 1)] = 3.0;
        grid.v[(3, 1)] = 0.5;
        assert_relative_eq!(grid.max_abs_u(), 4.0);
        assert_relative_eq!(grid.max_abs_v(), 0.5);
    }

    #[test]
    fn test_find_invalid_value() {
        let mut grid = Grid2D::new(GridDimensions2D(3, 3), CellSize2D(1.0, 1.0)).unwrap();
        assert!(grid.find_invalid_value(1e10).is_none());

        grid.p[(2, 3)] = f64::NAN;
        let (kind, i, j, value) = grid.find_invalid_value(1e10).unwrap();
        assert_eq!(kind, FieldKind::P);
        assert_eq!((i, j), (2, 3));
        assert!(value.is_nan());

        grid.p[(2, 3)] = 0.0;
        grid.v[(1, 2)] = 2e10;
        let (kind, _, _, _) = grid.find_invalid_value(1e10).unwrap();
        assert_eq!(kind, FieldKind::V);
    }

    #[test]
    fn test_velocity_sampling_of_uniform_flow() {
        let mut grid = Grid2D::new(GridDimensions2D(4, 3), CellSize2D(0.25, 0.5)).unwrap();
        grid.u.fill(1.5);
        grid.v.fill(-0.5);
        for &(x, y) in &[(0.0, 0.0), (0.3, 0.7), (1.0, 1.5), (0.125, 1.2)] {
            let (u, v) = grid.velocity_at(x, y);
            assert_relative_eq!(u, 1.5, epsilon = 1e-12);
            assert_relative_eq!(v, -0.5, epsilon = 1e-12);
        }
    }
}
