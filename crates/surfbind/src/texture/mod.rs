//! Texture/resource model that render targets attach to.
//!
//! - `TextureSource`: pixel storage with authoritative pixel size and resolution
//! - `Texture`: a framed, styled view over a source
//! - `Canvas` + `CanvasTextureCache`: presentable surfaces wrapped as textures
//!
//! All handles are single-threaded (`Rc`) and compare by identity.

mod canvas;
mod format;
mod source;
mod style;
#[allow(clippy::module_inception)]
mod texture;

use std::sync::atomic::{AtomicU32, Ordering};

pub use canvas::{Canvas, CanvasTextureCache, CanvasTextureOptions};
pub use format::TextureFormat;
pub use source::{SourceResource, TextureSource, TextureSourceDescriptor};
pub use style::{AddressMode, ScaleMode, TextureStyle};
pub use texture::Texture;

static NEXT_UID: AtomicU32 = AtomicU32::new(1);

/// Process-wide identity for sources, textures, canvases and render targets.
pub(crate) fn next_uid() -> u32 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}
