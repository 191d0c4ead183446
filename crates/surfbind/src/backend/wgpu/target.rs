/// A texture and its default view.
#[derive(Clone)]
pub(super) struct Attachment {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl Attachment {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        format: wgpu::TextureFormat,
        sample_count: u32,
        (width, height): (u32, u32),
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// wgpu objects behind one render target.
///
/// Resolved color storage lives in the adaptor's texture table (or the
/// presentation surface for screen targets); this only holds what is private to
/// the target: multisample color buffers and the depth-stencil buffer.
pub struct WgpuRenderTarget {
    /// Presentation surface key for screen targets.
    pub(super) canvas: Option<u32>,
    pub(super) sample_count: u32,
    pub(super) formats: Vec<wgpu::TextureFormat>,
    pub(super) msaa: Vec<Attachment>,
    pub(super) depth_stencil: Option<Attachment>,
    pub(super) pixel_width: u32,
    pub(super) pixel_height: u32,
}

impl WgpuRenderTarget {
    #[inline]
    pub fn is_screen(&self) -> bool {
        self.canvas.is_some()
    }

    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn msaa(&self) -> bool {
        self.sample_count > 1
    }

    pub fn has_depth_stencil(&self) -> bool {
        self.depth_stencil.is_some()
    }

    pub fn color_formats(&self) -> &[wgpu::TextureFormat] {
        &self.formats
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (self.pixel_width, self.pixel_height)
    }

    // (Re)creates the private attachments at the current size.
    pub(super) fn allocate(&mut self, device: &wgpu::Device, depth_stencil: bool) {
        let size = (self.pixel_width, self.pixel_height);
        self.msaa.clear();
        if self.msaa() {
            self.msaa = self
                .formats
                .iter()
                .map(|&f| Attachment::new(device, "surfbind msaa color", f, self.sample_count, size))
                .collect();
        }
        self.depth_stencil = depth_stencil.then(|| {
            Attachment::new(
                device,
                "surfbind depth-stencil",
                wgpu::TextureFormat::Depth24PlusStencil8,
                self.sample_count,
                size,
            )
        });
    }

    pub(super) fn release(&mut self) {
        for a in self.msaa.drain(..).chain(self.depth_stencil.take()) {
            a.texture.destroy();
        }
    }
}
