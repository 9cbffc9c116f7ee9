use nalgebra::DMatrix;
use crate::boundary::bc2d::{BoundaryCondition, DomainBoundaries};
use crate::domain::grid2d::Grid2D;
use crate::domain::mask::{CellType, Edge, Mask, ObstacleFace};

/// Sets the ghost and boundary-face velocities for the domain edges and all obstacle faces.
///
/// Left/right edges are written first, then bottom/top, then obstacles.
pub fn apply_velocity_boundaries(grid: &mut Grid2D, mask: &Mask, bcs: &DomainBoundaries) {
    apply_domain_velocity(grid, mask, bcs);
    apply_obstacle_velocity(grid, mask);
}

fn apply_domain_velocity(grid: &mut Grid2D, mask: &Mask, bcs: &DomainBoundaries) {
    let (nx, ny) = (grid.nx(), grid.ny());
    let Grid2D { u, v, .. } = grid;

    for j in 1..=ny {
        if mask.classify(0, j) == CellType::DomainBoundary(Edge::Left) {
            match bcs.left {
                BoundaryCondition::NoSlip { tangential } => {
                    u[(0, j)] = 0.0;
                    v[(0, j)] = 2.0 * tangential - v[(1, j)];
                }
                BoundaryCondition::FreeSlip => {
                    u[(0, j)] = 0.0;
                    v[(0, j)] = v[(1, j)];
                }
                BoundaryCondition::Inflow { u: u_in, v: v_in } => {
                    u[(0, j)] = u_in;
                    v[(0, j)] = 2.0 * v_in - v[(1, j)];
                }
                BoundaryCondition::Outflow | BoundaryCondition::Pressure { .. } => {
                    u[(0, j)] = u[(1, j)];
                    v[(0, j)] = v[(1, j)];
                }
            }
        }
        if mask.classify(nx + 1, j) == CellType::DomainBoundary(Edge::Right) {
            match bcs.right {
                BoundaryCondition::NoSlip { tangential } => {
                    u[(nx, j)] = 0.0;
                    v[(nx + 1, j)] = 2.0 * tangential - v[(nx, j)];
                }
                BoundaryCondition::FreeSlip => {
                    u[(nx, j)] = 0.0;
                    v[(nx + 1, j)] = v[(nx, j)];
                }
                BoundaryCondition::Inflow { u: u_in, v: v_in } => {
                    u[(nx, j)] = u_in;
                    v[(nx + 1, j)] = 2.0 * v_in - v[(nx, j)];
                }
                BoundaryCondition::Outflow | BoundaryCondition::Pressure { .. } => {
                    u[(nx, j)] = u[(nx - 1, j)];
                    v[(nx + 1, j)] = v[(nx, j)];
                }
            }
        }
    }

    for i in 1..=nx {
        if mask.classify(i, 0) == CellType::DomainBoundary(Edge::Bottom) {
            match bcs.bottom {
                BoundaryCondition::NoSlip { tangential } => {
                    v[(i, 0)] = 0.0;
                    u[(i, 0)] = 2.0 * tangential - u[(i, 1)];
                }
                BoundaryCondition::FreeSlip => {
                    v[(i, 0)] = 0.0;
                    u[(i, 0)] = u[(i, 1)];
                }
                BoundaryCondition::Inflow { u: u_in, v: v_in } => {
                    v[(i, 0)] = v_in;
                    u[(i, 0)] = 2.0 * u_in - u[(i, 1)];
                }
                BoundaryCondition::Outflow | BoundaryCondition::Pressure { .. } => {
                    v[(i, 0)] = v[(i, 1)];
                    u[(i, 0)] = u[(i, 1)];
                }
            }
        }
        if mask.classify(i, ny + 1) == CellType::DomainBoundary(Edge::Top) {
            match bcs.top {
                BoundaryCondition::NoSlip { tangential } => {
                    v[(i, ny)] = 0.0;
                    u[(i, ny + 1)] = 2.0 * tangential - u[(i, ny)];
                }
                BoundaryCondition::FreeSlip => {
                    v[(i, ny)] = 0.0;
                    u[(i, ny + 1)] = u[(i, ny)];
                }
                BoundaryCondition::Inflow { u: u_in, v: v_in } => {
                    v[(i, ny)] = v_in;
                    u[(i, ny + 1)] = 2.0 * u_in - u[(i, ny)];
                }
                BoundaryCondition::Outflow | BoundaryCondition::Pressure { .. } => {
                    v[(i, ny)] = v[(i, ny - 1)];
                    u[(i, ny + 1)] = u[(i, ny)];
                }
            }
        }
    }
}

/// No-slip on obstacle faces: normal components vanish, tangential ones are mirrored.
fn apply_obstacle_velocity(grid: &mut Grid2D, mask: &Mask) {
    let Grid2D { u, v, .. } = grid;
    for &(i, j, face) in mask.obstacle_boundaries() {
        match face {
            ObstacleFace::North => {
                v[(i, j)] = 0.0;
                u[(i, j)] = -u[(i, j + 1)];
                u[(i - 1, j)] = -u[(i - 1, j + 1)];
            }
            ObstacleFace::South => {
                v[(i, j - 1)] = 0.0;
                u[(i, j)] = -u[(i, j - 1)];
                u[(i - 1, j)] = -u[(i - 1, j - 1)];
            }
            ObstacleFace::East => {
                u[(i, j)] = 0.0;
                v[(i, j)] = -v[(i + 1, j)];
                v[(i, j - 1)] = -v[(i + 1, j - 1)];
            }
            ObstacleFace::West => {
                u[(i - 1, j)] = 0.0;
                v[(i, j)] = -v[(i - 1, j)];
                v[(i, j - 1)] = -v[(i - 1, j - 1)];
            }
            ObstacleFace::NorthEast => {
                u[(i, j)] = 0.0;
                v[(i, j)] = 0.0;
                u[(i - 1, j)] = -u[(i - 1, j + 1)];
                v[(i, j - 1)] = -v[(i + 1, j - 1)];
            }
            ObstacleFace::NorthWest => {
                u[(i - 1, j)] = 0.0;
                v[(i, j)] = 0.0;
                u[(i, j)] = -u[(i, j + 1)];
                v[(i, j - 1)] = -v[(i - 1, j - 1)];
            }
            ObstacleFace::SouthEast => {
                u[(i, j)] = 0.0;
                v[(i, j - 1)] = 0.0;
                u[(i - 1, j)] = -u[(i - 1, j - 1)];
                v[(i, j)] = -v[(i + 1, j)];
            }
            ObstacleFace::SouthWest => {
                u[(i - 1, j)] = 0.0;
                v[(i, j - 1)] = 0.0;
                u[(i, j)] = -u[(i, j - 1)];
                v[(i, j)] = -v[(i - 1, j)];
            }
        }
    }
}

/// F and G equal u and v on every face the momentum equation does not advance.
pub fn apply_predictor_boundaries(grid: &mut Grid2D, mask: &Mask) {
    let (nx, ny) = (grid.nx(), grid.ny());
    let Grid2D { u, v, f, g, .. } = grid;
    for j in 1..=ny {
        for i in 0..=nx {
            if !mask.u_face_is_fluid(i, j) {
                f[(i, j)] = u[(i, j)];
            }
        }
    }
    for j in 0..=ny {
        for i in 1..=nx {
            if !mask.v_face_is_fluid(i, j) {
                g[(i, j)] = v[(i, j)];
            }
        }
    }
}

/// Pressure ghost values for the Poisson solve.
///
/// Domain ghosts mirror their interior neighbour (zero gradient), except on
/// outflow and pressure edges where they are reflected about the prescribed
/// edge pressure (zero for outflow). Obstacle cells copy their fluid neighbour, or average both for
/// corner cells.
pub fn apply_pressure_boundaries(p: &mut DMatrix<f64>, mask: &Mask, bcs: &DomainBoundaries) {
    let nx = p.nrows() - 2;
    let ny = p.ncols() - 2;
    let ghost = |edge: Edge, interior: f64| match bcs.get(edge) {
        BoundaryCondition::Outflow => -interior,
        BoundaryCondition::Pressure { value } => 2.0 * value - interior,
        _ => interior,
    };
    for j in 1..=ny {
        if let CellType::DomainBoundary(edge) = mask.classify(0, j) {
            p[(0, j)] = ghost(edge, p[(1, j)]);
        }
        if let CellType::DomainBoundary(edge) = mask.classify(nx + 1, j) {
            p[(nx + 1, j)] = ghost(edge, p[(nx, j)]);
        }
    }
    for i in 1..=nx {
        if let CellType::DomainBoundary(edge) = mask.classify(i, 0) {
            p[(i, 0)] = ghost(edge, p[(i, 1)]);
        }
        if let CellType::DomainBoundary(edge) = mask.classify(i, ny + 1) {
            p[(i, ny + 1)] = ghost(edge, p[(i, ny)]);
        }
    }

    for &(i, j, face) in mask.obstacle_boundaries() {
        p[(i, j)] = match face {
            ObstacleFace::North => p[(i, j + 1)],
            ObstacleFace::South => p[(i, j - 1)],
            ObstacleFace::East => p[(i + 1, j)],
            ObstacleFace::West => p[(i - 1, j)],
            ObstacleFace::NorthEast => 0.5 * (p[(i, j + 1)] + p[(i + 1, j)]),
            ObstacleFace::NorthWest => 0.5 * (p[(i, j + 1)] + p[(i - 1, j)]),
            ObstacleFace::SouthEast => 0.5 * (p[(i, j - 1)] + p[(i + 1, j)]),
            ObstacleFace::SouthWest => 0.5 * (p[(i, j - 1)] + p[(i - 1, j)]),
        };
    }
}
