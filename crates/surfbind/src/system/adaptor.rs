use crate::coords::{ColorRgba, PixelRect};
use crate::target::{Clear, CopyRegion, RenderTarget};
use crate::texture::Texture;

/// Per-pass parameters computed by the system on bind.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassRequest {
    pub clear: Clear,
    pub clear_color: ColorRgba,
    /// Device-pixel viewport, top-left origin.
    pub viewport: PixelRect,
}

/// Multisampling decision for a new GPU render target.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GpuTargetOptions {
    /// Sample count to allocate; `1` means no MSAA.
    pub sample_count: u32,
}

impl GpuTargetOptions {
    #[inline]
    pub fn msaa(self) -> bool {
        self.sample_count > 1
    }
}

impl Default for GpuTargetOptions {
    fn default() -> Self {
        Self { sample_count: 1 }
    }
}

/// Native side of the render-target system.
///
/// One implementation per graphics backend. The system owns every `GpuTarget`
/// and is the only caller of `init_gpu_render_target`; adaptors never create
/// GPU render targets on their own.
pub trait RenderTargetAdaptor {
    /// Backend object realizing one logical render target.
    type GpuTarget;

    /// Highest MSAA sample count available; `1` means multisampling is unsupported.
    fn max_sample_count(&self) -> u32;

    fn init_gpu_render_target(
        &mut self,
        target: &RenderTarget,
        options: GpuTargetOptions,
    ) -> anyhow::Result<Self::GpuTarget>;

    /// Brings native storage in line with the target's current pixel size.
    ///
    /// Never called for root targets.
    fn resize_gpu_render_target(
        &mut self,
        target: &RenderTarget,
        gpu: &mut Self::GpuTarget,
    ) -> anyhow::Result<()>;

    /// Releases every native handle held by `gpu`.
    fn destroy_gpu_render_target(&mut self, gpu: Self::GpuTarget);

    fn start_render_pass(
        &mut self,
        target: &RenderTarget,
        gpu: &mut Self::GpuTarget,
        pass: &PassRequest,
    ) -> anyhow::Result<()>;

    fn clear(
        &mut self,
        target: &RenderTarget,
        gpu: &mut Self::GpuTarget,
        pass: &PassRequest,
    ) -> anyhow::Result<()>;

    /// Ends the pass; multisampled attachments are resolved when this returns.
    fn finish_render_pass(
        &mut self,
        target: &RenderTarget,
        gpu: &mut Self::GpuTarget,
    ) -> anyhow::Result<()>;

    /// Copies `region` of the resolved color[0] attachment into `destination`.
    fn copy_to_texture(
        &mut self,
        source: &RenderTarget,
        gpu: &mut Self::GpuTarget,
        destination: &Texture,
        region: CopyRegion,
    ) -> anyhow::Result<()>;

    /// Reads RGBA8 pixels of `rect` from the resolved color[0] attachment.
    fn read_pixels(
        &mut self,
        target: &RenderTarget,
        gpu: &mut Self::GpuTarget,
        rect: PixelRect,
    ) -> anyhow::Result<Vec<u8>>;

    /// Called before `texture` becomes a render destination.
    fn unbind_texture(&mut self, texture: &Texture) {
        let _ = texture;
    }

    fn prerender(&mut self, root: &RenderTarget) {
        let _ = root;
    }

    fn postrender(&mut self, root: &RenderTarget) {
        let _ = root;
    }
}
