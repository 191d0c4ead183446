//! Geometry types shared by targets, the system and the backends.
//!
//! Canonical CPU space:
//! - Logical units (device pixels / resolution)
//! - Origin top-left
//! - +X right, +Y down
//!
//! Backends work in device pixels (`PixelRect`).

mod color;
mod matrix;
mod rect;

pub use color::ColorRgba;
pub use matrix::{Matrix, ProjectionUniform};
pub use rect::{PixelRect, Rect};
