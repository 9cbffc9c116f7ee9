pub mod bitmap;
pub mod grid2d;
pub mod mask;
