//! Logical render targets and the math derived from them.

mod clear;
mod copy;
pub mod projection;
mod render_target;

pub use clear::Clear;
pub use copy::{clamp_copy_region, CopyRegion};
pub use render_target::{ColorTextures, RenderTarget, RenderTargetDescriptor};
