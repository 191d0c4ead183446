//! OpenGL ES 3.0 / WebGL2 backend on top of `glow`.

mod adaptor;
mod api;
mod target;

#[cfg(test)]
pub(crate) mod recording;

pub use adaptor::{GlAdaptorConfig, GlRenderTargetAdaptor};
pub use api::GlApi;
pub use target::GlRenderTarget;
