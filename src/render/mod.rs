//! CPU compositing.

/// Clip drawing and frame compositing.
pub mod draw;
/// Color-matrix, blur and shadow kernels.
pub mod filters;
/// Premultiplied RGBA8 surfaces.
pub mod surface;
