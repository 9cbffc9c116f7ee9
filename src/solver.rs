use nalgebra::DMatrix;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};
use crate::boundary::apply::{apply_predictor_boundaries, apply_velocity_boundaries};
use crate::boundary::bc2d::DomainBoundaries;
use crate::domain::grid2d::Grid2D;
use crate::domain::mask::Mask;
use crate::error::{ConfigurationError, DivergenceError, SimulationError};
use crate::json_io::JsonOutputManager;
use crate::numerical::Discretization;
use crate::poisson::{ConvergenceWarning, PressureReport, PressureSolver};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Initialized,
    Stepping,
    Finished,
}

/// Copy of the primary fields at the end of a completed step.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub step: usize,
    pub time: f64,
    pub u: DMatrix<f64>,
    pub v: DMatrix<f64>,
    pub p: DMatrix<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub step: usize,
    pub time: f64,
    pub dt: f64,
    pub pressure: PressureReport,
    pub warning: Option<ConvergenceWarning>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunReport {
    pub steps: usize,
    pub final_time: f64,
    pub warnings: Vec<ConvergenceWarning>,
}

/// Fractional-step solver for the incompressible Navier-Stokes equations on a
/// masked staggered grid.
///
/// The convective scheme is fixed by the type parameter for the whole run.
#[derive(Debug)]
pub struct Computation<D: Discretization> {
    pub grid: Grid2D,
    mask: Mask,
    boundaries: DomainBoundaries,
    discretization: D,
    pressure_solver: PressureSolver,
    settings: Settings,
    state: SimulationState,
    time: f64,
    steps: usize,
    last_good: Snapshot,
}

impl<D: Discretization> Computation<D> {
    pub fn new(settings: &Settings, mask: Mask, discretization: D) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        let grid = Grid2D::new(settings.dimensions(), settings.cell_size())?;
        if mask.dimensions() != grid.dimensions {
            return Err(ConfigurationError::InvalidGridSize(format!(
                "mask is {:?} but the grid is {:?}",
                mask.dimensions(),
                grid.dimensions
            )));
        }
        if discretization.cell_size() != grid.cell_size {
            return Err(ConfigurationError::InvalidParameter(format!(
                "discretization spacing {:?} does not match the grid spacing {:?}",
                discretization.cell_size(),
                grid.cell_size
            )));
        }
        let pressure_solver = settings.pressure_solver.build()?;

        let mut computation = Self {
            last_good: Snapshot {
                step: 0,
                time: 0.0,
                u: grid.u.clone(),
                v: grid.v.clone(),
                p: grid.p.clone(),
            },
            grid,
            mask,
            boundaries: settings.boundaries,
            discretization,
            pressure_solver,
            settings: settings.clone(),
            state: SimulationState::Initialized,
            time: 0.0,
            steps: 0,
        };
        apply_velocity_boundaries(&mut computation.grid, &computation.mask, &computation.boundaries);
        computation.last_good = computation.snapshot();
        info!(
            nx = computation.grid.nx(),
            ny = computation.grid.ny(),
            fluid_cells = computation.mask.fluid_cell_count(),
            obstacle_faces = computation.mask.obstacle_boundaries().len(),
            "Computation initialized"
        );
        Ok(computation)
    }

    /// Builds the mask from the settings' geometry, then constructs the computation.
    pub fn from_settings(settings: &Settings, discretization: D) -> Result<Self, SimulationError> {
        let mask = settings.build_mask()?;
        Ok(Self::new(settings, mask, discretization)?)
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps_completed(&self) -> usize {
        self.steps
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn pressure_solver(&self) -> &PressureSolver {
        &self.pressure_solver
    }

    /// State after the most recent step that passed the divergence check.
    pub fn last_good_snapshot(&self) -> &Snapshot {
        &self.last_good
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            step: self.steps,
            time: self.time,
            u: self.grid.u.clone(),
            v: self.grid.v.clone(),
            p: self.grid.p.clone(),
        }
    }

    /// Stable time step for the current velocities, shortened so the run ends exactly at `end_time`.
    ///
    /// `tau * min(Re/2 * dx²dy²/(dx²+dy²), dx/max|u|, dy/max|v|)`, capped at `maximum_dt`.
    pub fn compute_time_step_width(&self) -> f64 {
        let (dx, dy) = (self.grid.dx(), self.grid.dy());
        let (dx2, dy2) = (dx * dx, dy * dy);
        let diffusive = 0.5 * self.settings.re * dx2 * dy2 / (dx2 + dy2);
        let convective_u = dx / self.grid.max_abs_u();
        let convective_v = dy / self.grid.max_abs_v();
        let stable = self.settings.tau * diffusive.min(convective_u).min(convective_v);
        self.clamp_to_end_time(stable.min(self.settings.maximum_dt))
    }

    fn clamp_to_end_time(&self, dt: f64) -> f64 {
        dt.min(self.settings.end_time - self.time)
    }

    /// Advances one step using `fixed_dt` if configured, otherwise the stable width.
    ///
    /// Returns `Ok(None)` once the computation has finished.
    pub fn step(&mut self) -> Result<Option<StepReport>, SimulationError> {
        if self.state == SimulationState::Finished {
            return Ok(None);
        }
        let dt = match self.settings.fixed_dt {
            Some(dt) => self.clamp_to_end_time(dt),
            None => self.compute_time_step_width(),
        };
        self.advance(dt).map(Some)
    }

    /// Advances one step with the given width, bypassing the stability limit.
    pub fn step_with_dt(&mut self, dt: f64) -> Result<Option<StepReport>, SimulationError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(ConfigurationError::InvalidParameter(format!(
                "time step must be positive, got {}",
                dt
            ))
            .into());
        }
        if self.state == SimulationState::Finished {
            return Ok(None);
        }
        self.advance(self.clamp_to_end_time(dt)).map(Some)
    }

    fn advance(&mut self, dt: f64) -> Result<StepReport, SimulationError> {
        self.state = SimulationState::Stepping;

        self.compute_preliminary_velocities(dt);
        apply_predictor_boundaries(&mut self.grid, &self.mask);
        self.compute_right_hand_side(dt);
        let pressure = self.pressure_solver.solve(&mut self.grid, &self.mask, &self.boundaries);
        self.compute_velocities(dt);
        apply_velocity_boundaries(&mut self.grid, &self.mask, &self.boundaries);

        self.time += dt;
        self.steps += 1;

        if let Some((field, i, j, value)) = self.grid.find_invalid_value(self.settings.divergence_threshold) {
            return Err(DivergenceError {
                step: self.steps,
                time: self.time,
                field: field.name(),
                i,
                j,
                value,
            }
            .into());
        }

        // Relative tolerance so accumulated round-off cannot leave a zero-width final step
        if self.time >= self.settings.end_time * (1.0 - 1e-12) {
            self.state = SimulationState::Finished;
        }
        self.last_good = self.snapshot();

        let warning = (!pressure.converged).then(|| ConvergenceWarning {
            step: self.steps,
            time: self.time,
            iterations: pressure.iterations,
            residual: pressure.residual,
            epsilon: self.pressure_solver.epsilon(),
        });
        Ok(StepReport {
            step: self.steps,
            time: self.time,
            dt,
            pressure,
            warning,
        })
    }

    /// F and G on faces between two fluid cells.
    fn compute_preliminary_velocities(&mut self, dt: f64) {
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        let re = self.settings.re;
        let [gx, gy] = self.settings.gravity;
        let d = &self.discretization;

        for j in 1..=ny {
            for i in 1..nx {
                if !self.mask.u_face_is_fluid(i, j) {
                    continue;
                }
                let grid = &self.grid;
                let diffusion = (d.compute_d2u_dx2(grid, i, j) + d.compute_d2u_dy2(grid, i, j)) / re;
                let convection = d.compute_du2_dx(grid, i, j) + d.compute_duv_dy(grid, i, j);
                let f = grid.u[(i, j)] + dt * (diffusion - convection + gx);
                self.grid.f[(i, j)] = f;
            }
        }
        for j in 1..ny {
            for i in 1..=nx {
                if !self.mask.v_face_is_fluid(i, j) {
                    continue;
                }
                let grid = &self.grid;
                let diffusion = (d.compute_d2v_dx2(grid, i, j) + d.compute_d2v_dy2(grid, i, j)) / re;
                let convection = d.compute_duv_dx(grid, i, j) + d.compute_dv2_dy(grid, i, j);
                let g = grid.v[(i, j)] + dt * (diffusion - convection + gy);
                self.grid.g[(i, j)] = g;
            }
        }
    }

    fn compute_right_hand_side(&mut self, dt: f64) {
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        let (dx, dy) = (self.grid.dx(), self.grid.dy());
        let Grid2D { f, g, rhs, .. } = &mut self.grid;
        rhs.fill(0.0);
        for j in 1..=ny {
            for i in 1..=nx {
                if self.mask.is_fluid(i, j) {
                    let divergence = (f[(i, j)] - f[(i - 1, j)]) / dx + (g[(i, j)] - g[(i, j - 1)]) / dy;
                    rhs[(i, j)] = divergence / dt;
                }
            }
        }
    }

    fn compute_velocities(&mut self, dt: f64) {
        let (nx, ny) = (self.grid.nx(), self.grid.ny());
        let d = &self.discretization;
        for j in 1..=ny {
            for i in 1..nx {
                if self.mask.u_face_is_fluid(i, j) {
                    let dp_dx = d.compute_dp_dx(&self.grid, i, j);
                    self.grid.u[(i, j)] = self.grid.f[(i, j)] - dt * dp_dx;
                }
            }
        }
        for j in 1..ny {
            for i in 1..=nx {
                if self.mask.v_face_is_fluid(i, j) {
                    let dp_dy = d.compute_dp_dy(&self.grid, i, j);
                    self.grid.v[(i, j)] = self.grid.g[(i, j)] - dt * dp_dy;
                }
            }
        }
    }

    /// Largest discrete divergence over fluid cells whose four neighbours are fluid.
    pub fn max_interior_divergence(&self) -> f64 {
        let (dx, dy) = (self.grid.dx(), self.grid.dy());
        let Grid2D { u, v, .. } = &self.grid;
        let mut max = 0.0_f64;
        for j in 1..=self.grid.ny() {
            for i in 1..=self.grid.nx() {
                if self.mask.is_inner_fluid(i, j) {
                    let div = (u[(i, j)] - u[(i - 1, j)]) / dx + (v[(i, j)] - v[(i, j - 1)]) / dy;
                    max = max.max(div.abs());
                }
            }
        }
        max
    }

    /// Steps until `end_time`, collecting snapshots into `output` when one is given.
    ///
    /// On divergence the loop stops at the failing step and the error is
    /// returned; [`last_good_snapshot`](Self::last_good_snapshot) still holds
    /// the previous state.
    pub fn run(&mut self, mut output: Option<&mut JsonOutputManager>) -> Result<RunReport, SimulationError> {
        let run_span = info_span!("simulation_run", end_time = self.settings.end_time).entered();
        info!("Starting simulation until t = {}", self.settings.end_time);
        let start_time = Instant::now();

        if let Some(manager) = output.as_deref_mut() {
            manager.collect_if_due(&self.snapshot(), false)?;
        }

        let mut report = RunReport::default();
        while self.state != SimulationState::Finished {
            let step_span = info_span!("time_step", step = self.steps + 1).entered();
            let step_start = Instant::now();

            let step = match self.step() {
                Ok(Some(step)) => step,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Simulation step failed");
                    return Err(e);
                }
            };
            if let Some(warning) = step.warning {
                report.warnings.push(warning);
            }

            debug!(
                time = step.time,
                dt = step.dt,
                iterations = step.pressure.iterations,
                residual = step.pressure.residual,
                div = self.max_interior_divergence(),
                elapsed_ms = step_start.elapsed().as_millis() as u64,
                "Step complete"
            );
            if let Some(manager) = output.as_deref_mut() {
                manager.collect_if_due(&self.last_good, self.state == SimulationState::Finished)?;
            }
            report.steps += 1;
            drop(step_span);
        }
        report.final_time = self.time;

        if !report.warnings.is_empty() {
            warn!(
                count = report.warnings.len(),
                "Pressure solver missed its tolerance on some steps"
            );
        }
        info!(
            steps = report.steps,
            final_time = report.final_time,
            "Simulation finished in {:.2}s",
            start_time.elapsed().as_secs_f64()
        );
        drop(run_span);
        Ok(report)
    }
}
