//! Render-surface binding and GPU render-target lifecycle.
//!
//! A [`RenderTargetSystem`] turns canvases and textures into render targets on
//! demand, creates their native objects lazily through a [`RenderTargetAdaptor`]
//! and keeps the push/pop stack, viewport and projection of the current
//! destination. Backends live under [`backend`].

pub mod backend;
pub mod coords;
mod error;
pub mod logging;
pub mod system;
pub mod target;
pub mod texture;

pub use error::{Error, Result};
pub use system::{
    RenderStart, RenderSurface, RenderTargetAdaptor, RenderTargetHandle, RenderTargetSystem,
    RenderTargetSystemConfig,
};
pub use target::{Clear, RenderTarget, RenderTargetDescriptor};
pub use texture::{Canvas, Texture, TextureSource, TextureSourceDescriptor};
