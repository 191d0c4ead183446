/// Texture coordinate wrapping.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Texel filtering.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ScaleMode {
    Nearest,
    #[default]
    Linear,
}

/// Sampler settings attached to a texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureStyle {
    pub address_mode: AddressMode,
    pub scale_mode: ScaleMode,
    pub max_anisotropy: u16,
}

impl Default for TextureStyle {
    fn default() -> Self {
        Self {
            address_mode: AddressMode::default(),
            scale_mode: ScaleMode::default(),
            max_anisotropy: 1,
        }
    }
}

impl TextureStyle {
    /// Compact identity of the sampler settings; equal styles share an id.
    ///
    /// Layout: `anisotropy:12 | scale:2 | address:2`.
    pub fn id(&self) -> u16 {
        let address = match self.address_mode {
            AddressMode::ClampToEdge => 0,
            AddressMode::Repeat => 1,
            AddressMode::MirrorRepeat => 2,
        };
        let scale = match self.scale_mode {
            ScaleMode::Nearest => 0,
            ScaleMode::Linear => 1,
        };
        ((self.max_anisotropy.min(0x0fff)) << 4) | (scale << 2) | address
    }
}
