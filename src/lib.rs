//! Incompressible Navier-Stokes on a 2D staggered grid with obstacle masks.

pub mod boundary;
pub mod domain;
pub mod error;
pub mod json_io;
pub mod numerical;
pub mod poisson;
pub mod settings;
pub mod solver;
