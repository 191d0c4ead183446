use super::api::GlApi;

/// Native objects behind one render target on the GL backend.
///
/// Root targets draw into the default framebuffer and own nothing. Offscreen
/// targets own a framebuffer with their color textures attached; multisampled
/// ones render into a second framebuffer of multisample renderbuffers that is
/// blitted into the first when the pass finishes.
pub struct GlRenderTarget<A: GlApi> {
    /// Framebuffer with the color textures attached; `None` for the default framebuffer.
    pub(super) resolve_framebuffer: Option<A::Framebuffer>,
    /// Multisampled framebuffer rendered into while MSAA is active.
    pub(super) msaa_framebuffer: Option<A::Framebuffer>,
    pub(super) msaa_renderbuffers: Vec<A::Renderbuffer>,
    pub(super) depth_stencil: Option<A::Renderbuffer>,

    pub(super) sample_count: u32,
    pub(super) color_count: usize,
    pub(super) pixel_width: u32,
    pub(super) pixel_height: u32,
}

impl<A: GlApi> GlRenderTarget<A> {
    pub(super) fn default_framebuffer(pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            resolve_framebuffer: None,
            msaa_framebuffer: None,
            msaa_renderbuffers: Vec::new(),
            depth_stencil: None,
            sample_count: 1,
            color_count: 1,
            pixel_width,
            pixel_height,
        }
    }

    /// Framebuffer draw calls go to.
    #[inline]
    pub fn render_framebuffer(&self) -> Option<A::Framebuffer> {
        self.msaa_framebuffer.or(self.resolve_framebuffer)
    }

    /// Framebuffer holding the final (resolved) pixels.
    #[inline]
    pub fn resolve_framebuffer(&self) -> Option<A::Framebuffer> {
        self.resolve_framebuffer
    }

    #[inline]
    pub fn is_default_framebuffer(&self) -> bool {
        self.resolve_framebuffer.is_none()
    }

    #[inline]
    pub fn msaa(&self) -> bool {
        self.msaa_framebuffer.is_some()
    }

    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn has_depth_stencil(&self) -> bool {
        self.depth_stencil.is_some()
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixel_width, self.pixel_height)
    }
}
