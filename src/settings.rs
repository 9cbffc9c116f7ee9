use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use crate::boundary::bc2d::DomainBoundaries;
use crate::domain::bitmap::Bitmap;
use crate::domain::grid2d::{CellSize2D, GridDimensions2D};
use crate::domain::mask::{Mask, Rectangle};
use crate::error::{ConfigurationError, SimulationError};
use crate::numerical::Scheme;
use crate::poisson::{PressureSolver, SweepOrdering};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PressureSolverSettings {
    pub epsilon: f64,
    pub max_iterations: usize,
    pub omega: f64,
    pub ordering: SweepOrdering,
}

impl Default for PressureSolverSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            max_iterations: 10_000,
            omega: 1.0,
            ordering: SweepOrdering::Lexicographic,
        }
    }
}

impl PressureSolverSettings {
    pub fn build(&self) -> Result<PressureSolver, ConfigurationError> {
        PressureSolver::new(self.epsilon, self.max_iterations, self.omega, self.ordering)
    }
}

/// Obstacle layout of the domain.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    /// Every interior cell is fluid.
    #[default]
    #[serde(rename = "none")]
    Open,
    Bitmap { path: PathBuf },
    Rectangles { rectangles: Vec<Rectangle> },
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// Simulated time between snapshots; every step is kept when unset.
    pub interval: Option<f64>,
    /// No file is written when unset.
    pub path: Option<PathBuf>,
}

/// Run configuration, read from a JSON file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub n_cells: [usize; 2],
    pub physical_size: [f64; 2],
    pub re: f64,
    pub end_time: f64,
    pub tau: f64,
    pub maximum_dt: f64,
    pub fixed_dt: Option<f64>,
    pub gravity: [f64; 2],
    pub scheme: Scheme,
    pub boundaries: DomainBoundaries,
    pub pressure_solver: PressureSolverSettings,
    pub geometry: Geometry,
    pub output: OutputSettings,
    pub divergence_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            n_cells: [20, 20],
            physical_size: [1.0, 1.0],
            re: 1000.0,
            end_time: 10.0,
            tau: 0.5,
            maximum_dt: 0.1,
            fixed_dt: None,
            gravity: [0.0, 0.0],
            scheme: Scheme::CentralDifferences,
            boundaries: DomainBoundaries::lid_driven(1.0),
            pressure_solver: PressureSolverSettings::default(),
            geometry: Geometry::Open,
            output: OutputSettings::default(),
            divergence_threshold: 1e10,
        }
    }
}

impl Settings {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigurationError> {
        let settings: Settings =
            serde_json::from_str(text).map_err(|e| ConfigurationError::Settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SimulationError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_json_str(&text)?)
    }

    pub fn dimensions(&self) -> GridDimensions2D {
        GridDimensions2D(self.n_cells[0], self.n_cells[1])
    }

    pub fn cell_size(&self) -> CellSize2D {
        CellSize2D(
            self.physical_size[0] / self.n_cells[0] as f64,
            self.physical_size[1] / self.n_cells[1] as f64,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let [nx, ny] = self.n_cells;
        if nx == 0 || ny == 0 {
            return Err(ConfigurationError::InvalidGridSize(format!(
                "n_cells must be positive, got [{}, {}]",
                nx, ny
            )));
        }
        let [lx, ly] = self.physical_size;
        if !(lx > 0.0 && ly > 0.0 && lx.is_finite() && ly.is_finite()) {
            return Err(ConfigurationError::InvalidGridSize(format!(
                "physical_size must be positive, got [{}, {}]",
                lx, ly
            )));
        }

        let positive = |name: &str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigurationError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, value
                )))
            }
        };
        positive("re", self.re)?;
        positive("end_time", self.end_time)?;
        positive("maximum_dt", self.maximum_dt)?;
        positive("divergence_threshold", self.divergence_threshold)?;
        if let Some(dt) = self.fixed_dt {
            positive("fixed_dt", dt)?;
        }
        if let Some(interval) = self.output.interval {
            positive("output.interval", interval)?;
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return Err(ConfigurationError::InvalidParameter(format!(
                "tau must lie in (0, 1], got {}",
                self.tau
            )));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(ConfigurationError::InvalidParameter(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        if let Scheme::DonorCell { gamma } = self.scheme {
            if !(0.0..=1.0).contains(&gamma) {
                return Err(ConfigurationError::InvalidParameter(format!(
                    "donor-cell gamma must be in [0, 1], got {}",
                    gamma
                )));
            }
        }
        self.pressure_solver.build()?;
        self.boundaries.validate()?;
        Ok(())
    }

    /// Builds the obstacle mask described by `geometry`, reading the bitmap file if needed.
    pub fn build_mask(&self) -> Result<Mask, SimulationError> {
        let mask = match &self.geometry {
            Geometry::Open => Mask::all_fluid(self.dimensions())?,
            Geometry::Bitmap { path } => {
                let bitmap = Bitmap::from_file(path)?;
                Mask::from_bitmap(&bitmap, self.dimensions())?
            }
            Geometry::Rectangles { rectangles } => {
                Mask::from_rectangles(self.dimensions(), (self.physical_size[0], self.physical_size[1]), rectangles)?
            }
        };
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::bc2d::BoundaryCondition;
    use approx::assert_relative_eq;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.dimensions(), GridDimensions2D(20, 20));
        assert_relative_eq!(settings.cell_size().0, 0.05);
    }

    #[test]
    fn test_from_json_str_overrides_defaults() {
        let json = r#"{
            "n_cells": [40, 10],
            "physical_size": [4.0, 1.0],
            "re": 100.0,
            "scheme": { "type": "donor_cell", "gamma": 0.5 },
            "boundaries": {
                "left": { "type": "inflow", "u": 1.0, "v": 0.0 },
                "right": { "type": "outflow" }
            },
            "pressure_solver": { "omega": 1.7, "ordering": "red_black" },
            "geometry": { "type": "rectangles", "rectangles": [ { "x": 1.0, "y": 0.3, "width": 0.4, "height": 0.4 } ] },
            "output": { "interval": 0.5 }
        }"#;
        let settings = Settings::from_json_str(json).unwrap();
        assert_eq!(settings.n_cells, [40, 10]);
        assert_relative_eq!(settings.cell_size().0, 0.1);
        assert_eq!(settings.scheme, Scheme::DonorCell { gamma: 0.5 });
        assert_eq!(settings.boundaries.right, BoundaryCondition::Outflow);
        assert_eq!(settings.boundaries.top, BoundaryCondition::wall());
        assert_eq!(settings.pressure_solver.ordering, SweepOrdering::RedBlack);
        assert_eq!(settings.pressure_solver.max_iterations, 10_000);
        assert_eq!(settings.output.interval, Some(0.5));
        assert_relative_eq!(settings.tau, 0.5);

        let mask = settings.build_mask().unwrap();
        // x in [1.0, 1.4) covers i = 11..=14
        assert!(mask.is_obstacle(11, 5));
        assert!(mask.is_fluid(10, 5));
    }

    #[test]
    fn test_validation_errors() {
        let cases = vec![
            Settings { n_cells: [0, 4], ..Settings::default() },
            Settings { physical_size: [1.0, -1.0], ..Settings::default() },
            Settings { re: 0.0, ..Settings::default() },
            Settings { tau: 1.5, ..Settings::default() },
            Settings { maximum_dt: 0.0, ..Settings::default() },
            Settings { fixed_dt: Some(-1.0), ..Settings::default() },
            Settings { scheme: Scheme::DonorCell { gamma: 2.0 }, ..Settings::default() },
            Settings {
                pressure_solver: PressureSolverSettings { omega: 2.5, ..PressureSolverSettings::default() },
                ..Settings::default()
            },
            Settings {
                boundaries: DomainBoundaries {
                    left: BoundaryCondition::Inflow { u: 1.0, v: 0.0 },
                    ..DomainBoundaries::default()
                },
                ..Settings::default()
            },
        ];
        for settings in cases {
            assert!(settings.validate().is_err(), "expected rejection of {:?}", settings);
        }
    }

    #[test]
    fn test_unknown_keys_and_bad_json_are_configuration_errors() {
        assert!(matches!(
            Settings::from_json_str(r#"{ "reynolds": 10 }"#),
            Err(ConfigurationError::Settings(_))
        ));
        assert!(matches!(Settings::from_json_str("{"), Err(ConfigurationError::Settings(_))));
    }

    #[test]
    fn test_from_json_file_with_bitmap_geometry() -> Result<(), SimulationError> {
        let dir = tempdir()?;
        let bitmap_path = dir.path().join("step.png");
        // black step in the bottom-left corner of a white image
        RgbaImage::from_fn(4, 3, |x, y| {
            if x < 2 && y == 2 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        })
        .save(&bitmap_path)
        .unwrap();
        let settings_path = dir.path().join("settings.json");
        let json = format!(
            r#"{{ "n_cells": [4, 3], "geometry": {{ "type": "bitmap", "path": {:?} }} }}"#,
            bitmap_path.to_string_lossy()
        );
        fs::write(&settings_path, json)?;

        let settings = Settings::from_json_file(&settings_path)?;
        let mask = settings.build_mask()?;
        // bottom image row is j = 1
        assert!(mask.is_obstacle(1, 1));
        assert!(mask.is_obstacle(2, 1));
        assert!(mask.is_fluid(3, 1));
        assert!(mask.is_fluid(1, 2));
        Ok(())
    }

    #[test]
    fn test_bitmap_size_mismatch_is_reported() -> Result<(), SimulationError> {
        let dir = tempdir()?;
        let bitmap_path = dir.path().join("small.txt");
        fs::write(&bitmap_path, "..\n..\n")?;
        let settings = Settings {
            n_cells: [4, 4],
            geometry: Geometry::Bitmap { path: bitmap_path },
            ..Settings::default()
        };
        assert!(matches!(
            settings.build_mask(),
            Err(SimulationError::Configuration(ConfigurationError::BitmapSizeMismatch { .. }))
        ));
        Ok(())
    }
}
