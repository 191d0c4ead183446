//! Native adaptors.

pub mod gl;
pub mod wgpu;
