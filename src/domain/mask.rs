use std::fmt;
use serde::Deserialize;
use crate::domain::bitmap::Bitmap;
use crate::domain::grid2d::GridDimensions2D;
use crate::error::ConfigurationError;

/// Side of the rectangular domain a ghost cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Left,
    Right,
    Bottom,
    Top,
}

/// Which neighbours of an obstacle cell are fluid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObstacleFace {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl ObstacleFace {
    fn from_neighbours(north: bool, south: bool, east: bool, west: bool) -> Option<Self> {
        match (north, south, east, west) {
            (true, false, false, false) => Some(ObstacleFace::North),
            (false, true, false, false) => Some(ObstacleFace::South),
            (false, false, true, false) => Some(ObstacleFace::East),
            (false, false, false, true) => Some(ObstacleFace::West),
            (true, false, true, false) => Some(ObstacleFace::NorthEast),
            (true, false, false, true) => Some(ObstacleFace::NorthWest),
            (false, true, true, false) => Some(ObstacleFace::SouthEast),
            (false, true, false, true) => Some(ObstacleFace::SouthWest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Fluid,
    /// Obstacle without any fluid neighbour, including the ghost corners.
    Obstacle,
    ObstacleBoundary(ObstacleFace),
    DomainBoundary(Edge),
}

/// Obstacle rectangle in physical coordinates, lower-left corner at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Per-cell classification over the padded `(nx + 2) x (ny + 2)` grid.
///
/// Built once before the first step and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Mask {
    dimensions: GridDimensions2D,
    cells: Vec<CellType>,
    obstacle_boundaries: Vec<(usize, usize, ObstacleFace)>,
    fluid_cells: usize,
}

impl Mask {
    pub fn all_fluid(dimensions: GridDimensions2D) -> Result<Self, ConfigurationError> {
        Self::from_obstacles(dimensions, |_, _| false)
    }

    /// One pixel per interior cell; the top image row becomes `j = ny`.
    pub fn from_bitmap(bitmap: &Bitmap, dimensions: GridDimensions2D) -> Result<Self, ConfigurationError> {
        let GridDimensions2D(nx, ny) = dimensions;
        if bitmap.width() != nx || bitmap.height() != ny {
            return Err(ConfigurationError::BitmapSizeMismatch {
                width: bitmap.width(),
                height: bitmap.height(),
                nx,
                ny,
            });
        }
        Self::from_obstacles(dimensions, |i, j| bitmap.is_obstacle(i - 1, ny - j))
    }

    /// Rasterizes rectangles: floor on the lower corner, ceil on the upper one.
    ///
    /// Coordinates within round-off of a grid line are snapped onto it, so an
    /// edge placed exactly on a cell boundary never claims the neighbouring cell.
    pub fn from_rectangles(
        dimensions: GridDimensions2D,
        physical_size: (f64, f64),
        rectangles: &[Rectangle],
    ) -> Result<Self, ConfigurationError> {
        let GridDimensions2D(nx, ny) = dimensions;
        let (lx, ly) = physical_size;
        let mut ranges = Vec::with_capacity(rectangles.len());
        for rect in rectangles {
            if !(rect.width > 0.0 && rect.height > 0.0) {
                return Err(ConfigurationError::InvalidParameter(format!(
                    "Obstacle rectangle must have positive extent, got {:?}",
                    rect
                )));
            }
            let i_beg = grid_line(rect.x, lx, nx, f64::floor) + 1;
            let i_end = grid_line(rect.x + rect.width, lx, nx, f64::ceil) + 1;
            let j_beg = grid_line(rect.y, ly, ny, f64::floor) + 1;
            let j_end = grid_line(rect.y + rect.height, ly, ny, f64::ceil) + 1;
            ranges.push((i_beg..i_end, j_beg..j_end));
        }
        Self::from_obstacles(dimensions, |i, j| {
            ranges.iter().any(|(ri, rj)| ri.contains(&i) && rj.contains(&j))
        })
    }

    /// `is_obstacle` is queried for interior cells `1..=nx` x `1..=ny`.
    pub fn from_obstacles<F>(dimensions: GridDimensions2D, is_obstacle: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(usize, usize) -> bool,
    {
        let GridDimensions2D(nx, ny) = dimensions;
        if nx < 1 || ny < 1 {
            return Err(ConfigurationError::InvalidGridSize(
                "Mask dimensions (nx, ny) must be at least 1x1.".to_string(),
            ));
        }
        let rows = nx + 2;
        let cols = ny + 2;
        let mut solid = vec![true; rows * cols];
        for j in 1..=ny {
            for i in 1..=nx {
                solid[i + j * rows] = is_obstacle(i, j);
            }
        }
        let fluid = |i: usize, j: usize| !solid[i + j * rows];
        // ghost cells are domain edges, not obstacles
        let open = |i: usize, j: usize| fluid(i, j) || i == 0 || i == nx + 1 || j == 0 || j == ny + 1;

        let mut cells = vec![CellType::Obstacle; rows * cols];
        let mut fluid_cells = 0;

        for j in 1..=ny {
            for i in 1..=nx {
                if !fluid(i, j) {
                    continue;
                }
                if !(open(i - 1, j) || open(i + 1, j) || open(i, j - 1) || open(i, j + 1)) {
                    return Err(ConfigurationError::EnclosedFluidCell { i, j });
                }
                cells[i + j * rows] = CellType::Fluid;
                fluid_cells += 1;
            }
        }
        if fluid_cells == 0 {
            return Err(ConfigurationError::NoFluidCells);
        }

        let mut obstacle_boundaries = Vec::new();
        for j in 1..=ny {
            for i in 1..=nx {
                if fluid(i, j) {
                    continue;
                }
                let (north, south) = (fluid(i, j + 1), fluid(i, j - 1));
                let (east, west) = (fluid(i + 1, j), fluid(i - 1, j));
                if !(north || south || east || west) {
                    continue;
                }
                let face = ObstacleFace::from_neighbours(north, south, east, west)
                    .ok_or(ConfigurationError::ThinObstacle { i, j })?;
                cells[i + j * rows] = CellType::ObstacleBoundary(face);
                obstacle_boundaries.push((i, j, face));
            }
        }

        // Ghost ring; cells backed by an obstacle stay `Obstacle`, as do the corners.
        for j in 1..=ny {
            if fluid(1, j) {
                cells[j * rows] = CellType::DomainBoundary(Edge::Left);
            }
            if fluid(nx, j) {
                cells[(nx + 1) + j * rows] = CellType::DomainBoundary(Edge::Right);
            }
        }
        for i in 1..=nx {
            if fluid(i, 1) {
                cells[i] = CellType::DomainBoundary(Edge::Bottom);
            }
            if fluid(i, ny) {
                cells[i + (ny + 1) * rows] = CellType::DomainBoundary(Edge::Top);
            }
        }

        Ok(Self {
            dimensions,
            cells,
            obstacle_boundaries,
            fluid_cells,
        })
    }

    pub fn dimensions(&self) -> GridDimensions2D {
        self.dimensions
    }

    pub fn classify(&self, i: usize, j: usize) -> CellType {
        self.cells[i + j * (self.dimensions.0 + 2)]
    }

    pub fn is_fluid(&self, i: usize, j: usize) -> bool {
        self.classify(i, j) == CellType::Fluid
    }

    pub fn is_obstacle(&self, i: usize, j: usize) -> bool {
        matches!(self.classify(i, j), CellType::Obstacle | CellType::ObstacleBoundary(_))
    }

    /// Fluid cell whose four neighbours are fluid as well.
    pub fn is_inner_fluid(&self, i: usize, j: usize) -> bool {
        self.is_fluid(i, j)
            && self.is_fluid(i - 1, j)
            && self.is_fluid(i + 1, j)
            && self.is_fluid(i, j - 1)
            && self.is_fluid(i, j + 1)
    }

    /// u(i, j) lies between two fluid cells and is advanced by the momentum equation.
    pub fn u_face_is_fluid(&self, i: usize, j: usize) -> bool {
        self.is_fluid(i, j) && self.is_fluid(i + 1, j)
    }

    /// v(i, j) lies between two fluid cells and is advanced by the momentum equation.
    pub fn v_face_is_fluid(&self, i: usize, j: usize) -> bool {
        self.is_fluid(i, j) && self.is_fluid(i, j + 1)
    }

    pub fn fluid_cell_count(&self) -> usize {
        self.fluid_cells
    }

    /// Interior obstacle cells touching fluid, in ascending (j, i) order.
    pub fn obstacle_boundaries(&self) -> &[(usize, usize, ObstacleFace)] {
        &self.obstacle_boundaries
    }
}

/// Index of the grid line at physical `position`, rounded with `round` and clamped to `0..=n`.
fn grid_line(position: f64, length: f64, n: usize, round: fn(f64) -> f64) -> usize {
    let scaled = position / length * n as f64;
    let nearest = scaled.round();
    let scaled = if (scaled - nearest).abs() < 1e-9 { nearest } else { scaled };
    (round(scaled).max(0.0) as usize).min(n)
}

impl fmt::Display for Mask {
    /// Top row first: `.` fluid, `#` obstacle, `+` obstacle boundary, `=` domain boundary.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let GridDimensions2D(nx, ny) = self.dimensions;
        for j in (0..ny + 2).rev() {
            for i in 0..nx + 2 {
                let c = match self.classify(i, j) {
                    CellType::Fluid => '.',
                    CellType::Obstacle => '#',
                    CellType::ObstacleBoundary(_) => '+',
                    CellType::DomainBoundary(_) => '=',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
