pub mod apply;
pub mod bc2d;
