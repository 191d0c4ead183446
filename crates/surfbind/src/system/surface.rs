use crate::texture::{Canvas, Texture};

slotmap::new_key_type! {
    /// Arena index of a render target owned by a `RenderTargetSystem`.
    pub struct RenderTargetHandle;
}

/// Anything that can be rendered into.
#[derive(Debug, Copy, Clone)]
pub enum RenderSurface<'a> {
    Canvas(&'a Canvas),
    Texture(&'a Texture),
    Target(RenderTargetHandle),
}

impl<'a> From<&'a Canvas> for RenderSurface<'a> {
    fn from(c: &'a Canvas) -> Self {
        RenderSurface::Canvas(c)
    }
}

impl<'a> From<&'a Texture> for RenderSurface<'a> {
    fn from(t: &'a Texture) -> Self {
        RenderSurface::Texture(t)
    }
}

impl From<RenderTargetHandle> for RenderSurface<'_> {
    fn from(h: RenderTargetHandle) -> Self {
        RenderSurface::Target(h)
    }
}

/// Identity of the surface a registry entry was created for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SurfaceKey {
    Canvas(u32),
    Texture(u32),
    /// A caller-constructed target, keyed by its own uid.
    Target(u32),
}
