use nalgebra::DMatrix;
use crate::domain::grid2d::{CellSize2D, GridDimensions2D};

/// Bilinear interpolation of the staggered u component.
///
/// u(i, j) sits at `(i * dx, (j - 0.5) * dy)`. Positions outside the domain are
/// clamped to the outermost stencil.
pub fn interpolate_u_at(u: &DMatrix<f64>, dims: GridDimensions2D, cell: CellSize2D, x: f64, y: f64) -> f64 {
    let GridDimensions2D(nx, ny) = dims;
    let CellSize2D(dx, dy) = cell;
    let i = cell_index(x / dx, nx);
    let j = cell_index((y + 0.5 * dy) / dy, ny);
    let x1 = i as f64 * dx;
    let y1 = (j as f64 - 0.5) * dy;
    bilinear(u, i, j, (x - x1) / dx, (y - y1) / dy)
}

/// Bilinear interpolation of the staggered v component, v(i, j) at `((i - 0.5) * dx, j * dy)`.
pub fn interpolate_v_at(v: &DMatrix<f64>, dims: GridDimensions2D, cell: CellSize2D, x: f64, y: f64) -> f64 {
    let GridDimensions2D(nx, ny) = dims;
    let CellSize2D(dx, dy) = cell;
    let i = cell_index((x + 0.5 * dx) / dx, nx);
    let j = cell_index(y / dy, ny);
    let x1 = (i as f64 - 0.5) * dx;
    let y1 = j as f64 * dy;
    bilinear(v, i, j, (x - x1) / dx, (y - y1) / dy)
}

fn cell_index(scaled: f64, n: usize) -> usize {
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else {
        (scaled.floor() as usize).min(n)
    }
}

fn bilinear(field: &DMatrix<f64>, i: usize, j: usize, sx: f64, sy: f64) -> f64 {
    let sx = sx.clamp(0.0, 1.0);
    let sy = sy.clamp(0.0, 1.0);
    (1.0 - sx) * (1.0 - sy) * field[(i, j)]
        + sx * (1.0 - sy) * field[(i + 1, j)]
        + (1.0 - sx) * sy * field[(i, j + 1)]
        + sx * sy * field[(i + 1, j + 1)]
}

/// Averages u onto the `nx x ny` interior cell centres.
pub fn interpolate_u_to_cell_centers(u: &DMatrix<f64>) -> DMatrix<f64> {
    let nx = u.nrows() - 2;
    let ny = u.ncols() - 2;
    DMatrix::from_fn(nx, ny, |r, c| 0.5 * (u[(r, c + 1)] + u[(r + 1, c + 1)]))
}

/// Averages v onto the `nx x ny` interior cell centres.
pub fn interpolate_v_to_cell_centers(v: &DMatrix<f64>) -> DMatrix<f64> {
    let nx = v.nrows() - 2;
    let ny = v.ncols() - 2;
    DMatrix::from_fn(nx, ny, |r, c| 0.5 * (v[(r + 1, c)] + v[(r + 1, c + 1)]))
}

/// Interior block of a cell-centred field.
pub fn interior_cells(p: &DMatrix<f64>) -> DMatrix<f64> {
    p.view((1, 1), (p.nrows() - 2, p.ncols() - 2)).into_owned()
}
