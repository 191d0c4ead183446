/// Pixel formats a texture source can carry.
///
/// The set is intentionally limited to formats both backends can render into.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Depth24PlusStencil8,
}

impl TextureFormat {
    /// Blue-first channel order; read-back swizzles these to RGBA.
    #[inline]
    pub fn is_bgra(self) -> bool {
        matches!(self, TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb)
    }

    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            TextureFormat::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
        }
    }

    /// Maps a surface format chosen by wgpu back into the source model.
    ///
    /// Returns `None` for formats sources cannot describe.
    pub fn from_wgpu(format: wgpu::TextureFormat) -> Option<Self> {
        match format {
            wgpu::TextureFormat::Rgba8Unorm => Some(TextureFormat::Rgba8Unorm),
            wgpu::TextureFormat::Rgba8UnormSrgb => Some(TextureFormat::Rgba8UnormSrgb),
            wgpu::TextureFormat::Bgra8Unorm => Some(TextureFormat::Bgra8Unorm),
            wgpu::TextureFormat::Bgra8UnormSrgb => Some(TextureFormat::Bgra8UnormSrgb),
            wgpu::TextureFormat::Depth24PlusStencil8 => Some(TextureFormat::Depth24PlusStencil8),
            _ => None,
        }
    }
}
