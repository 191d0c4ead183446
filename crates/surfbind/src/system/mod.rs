//! Surface binding: resolves surfaces to render targets and drives an adaptor.

mod adaptor;
mod render_target_system;
mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use adaptor::{GpuTargetOptions, PassRequest, RenderTargetAdaptor};
pub use render_target_system::{
    RenderStart, RenderTargetObserver, RenderTargetSystem, RenderTargetSystemConfig,
};
pub use surface::{RenderSurface, RenderTargetHandle, SurfaceKey};
