use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Invalid grid size: {0}")]
    InvalidGridSize(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Bitmap is {width}x{height} pixels but the grid has {nx}x{ny} cells")]
    BitmapSizeMismatch {
        width: usize,
        height: usize,
        nx: usize,
        ny: usize,
    },

    #[error("Malformed bitmap: {0}")]
    MalformedBitmap(String),

    #[error("Fluid cell ({i}, {j}) is enclosed by obstacle cells on all four sides")]
    EnclosedFluidCell { i: usize, j: usize },

    #[error("Obstacle is only one cell wide at ({i}, {j})")]
    ThinObstacle { i: usize, j: usize },

    #[error("Domain contains no fluid cells")]
    NoFluidCells,

    #[error("Invalid boundary condition combination: {0}")]
    InvalidBoundaryCombination(String),

    #[error("Could not read settings: {0}")]
    Settings(String),
}

/// Non-finite or runaway value found in a field after a completed step.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Simulation diverged at step {step} (t = {time:.6}): {field}({i}, {j}) = {value}")]
pub struct DivergenceError {
    pub step: usize,
    pub time: f64,
    pub field: &'static str,
    pub i: usize,
    pub j: usize,
    pub value: f64,
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Divergence(#[from] DivergenceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
