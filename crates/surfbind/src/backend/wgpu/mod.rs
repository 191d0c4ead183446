//! wgpu backend: offscreen textures, MSAA resolve and window presentation.

mod adaptor;
mod config;
mod device;
mod plan;
mod surface;
mod target;

pub use adaptor::WgpuRenderTargetAdaptor;
pub use config::WgpuAdaptorConfig;
pub use device::WgpuContext;
pub use plan::PassPlan;
pub use target::WgpuRenderTarget;
