use crate::coords::{Matrix, PixelRect};
use crate::error::{Error, Result};
use crate::texture::{next_uid, Texture, TextureFormat, TextureSourceDescriptor};

use super::projection::{calculate_projection, normalized_viewport};

/// Color attachments of a new render target.
#[derive(Debug, Clone)]
pub enum ColorTextures {
    /// Allocate `n` textures owned by the target.
    Count(usize),
    /// Attach existing textures; the first one dictates the size.
    Textures(Vec<Texture>),
}

/// Parameters for creating a [`RenderTarget`].
#[derive(Debug, Clone)]
pub struct RenderTargetDescriptor {
    /// Logical width, used only for owned color textures.
    pub width: f32,
    /// Logical height, used only for owned color textures.
    pub height: f32,
    pub resolution: f32,
    pub color_textures: ColorTextures,
    pub depth: bool,
    pub stencil: bool,
    /// Existing depth/stencil texture. When `None` and `depth`/`stencil` is set,
    /// one is allocated and owned by the target.
    pub depth_stencil_texture: Option<Texture>,
    pub antialias: bool,
    /// Forces root treatment even when color[0] is not a canvas.
    pub is_root: bool,
    pub label: Option<String>,
}

impl Default for RenderTargetDescriptor {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            resolution: 1.0,
            color_textures: ColorTextures::Count(1),
            depth: false,
            stencil: false,
            depth_stencil_texture: None,
            antialias: false,
            is_root: false,
            label: None,
        }
    }
}

/// Backend-agnostic description of a render destination.
///
/// Color texture 0 is authoritative for size and resolution; all other attachments
/// follow it. `dirty_id` advances on every effective resize so backends can
/// reconcile their native objects lazily.
#[derive(Debug)]
pub struct RenderTarget {
    uid: u32,
    label: Option<String>,

    color_textures: Vec<Texture>,
    owns_color_textures: bool,

    depth_stencil_texture: Option<Texture>,
    owns_depth_stencil: bool,

    depth: bool,
    stencil: bool,
    antialias: bool,
    is_root: bool,

    dirty_id: u32,
    /// color[0] source `change_id` at the last reconciliation.
    observed_change_id: u32,
}

impl RenderTarget {
    pub fn new(desc: RenderTargetDescriptor) -> Result<Self> {
        let resolution = if desc.resolution > 0.0 { desc.resolution } else { 1.0 };

        let (color_textures, owns_color_textures) = match desc.color_textures {
            ColorTextures::Count(0) => return Err(Error::NoColorTextures),
            ColorTextures::Count(n) => {
                let textures = (0..n)
                    .map(|i| {
                        Texture::create(TextureSourceDescriptor {
                            width: desc.width,
                            height: desc.height,
                            resolution,
                            antialias: desc.antialias,
                            label: desc.label.as_ref().map(|l| format!("{l} color {i}")),
                            ..Default::default()
                        })
                    })
                    .collect::<Vec<_>>();
                (textures, true)
            }
            ColorTextures::Textures(textures) if textures.is_empty() => {
                return Err(Error::NoColorTextures);
            }
            ColorTextures::Textures(textures) => (textures, false),
        };

        let primary = color_textures[0].source();
        let is_root = desc.is_root || primary.is_screen();
        let antialias = desc.antialias || color_textures.iter().any(|t| t.source().antialias());

        let mut target = Self {
            uid: next_uid(),
            label: desc.label,
            color_textures,
            owns_color_textures,
            depth_stencil_texture: None,
            owns_depth_stencil: false,
            depth: desc.depth,
            stencil: desc.stencil,
            antialias,
            is_root,
            dirty_id: 0,
            observed_change_id: primary.change_id(),
        };

        if !owns_color_textures {
            // Bring secondary attachments in line with color[0].
            target.resize_from_source();
        }

        match desc.depth_stencil_texture {
            Some(texture) => target.depth_stencil_texture = Some(texture),
            None if desc.depth || desc.stencil => target.ensure_depth_stencil_texture(),
            None => {}
        }

        Ok(target)
    }

    /// Wraps a single existing texture.
    pub fn from_texture(texture: Texture) -> Result<Self> {
        Self::new(RenderTargetDescriptor {
            color_textures: ColorTextures::Textures(vec![texture]),
            ..Default::default()
        })
    }

    #[inline]
    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The authoritative color texture.
    #[inline]
    pub fn color_texture(&self) -> &Texture {
        &self.color_textures[0]
    }

    #[inline]
    pub fn color_textures(&self) -> &[Texture] {
        &self.color_textures
    }

    #[inline]
    pub fn owns_color_textures(&self) -> bool {
        self.owns_color_textures
    }

    #[inline]
    pub fn depth_stencil_texture(&self) -> Option<&Texture> {
        self.depth_stencil_texture.as_ref()
    }

    pub fn width(&self) -> f32 {
        self.color_texture().source().width()
    }

    pub fn height(&self) -> f32 {
        self.color_texture().source().height()
    }

    pub fn resolution(&self) -> f32 {
        self.color_texture().source().resolution()
    }

    pub fn pixel_width(&self) -> u32 {
        self.color_texture().source().pixel_width()
    }

    pub fn pixel_height(&self) -> u32 {
        self.color_texture().source().pixel_height()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    #[inline]
    pub fn depth(&self) -> bool {
        self.depth
    }

    #[inline]
    pub fn stencil(&self) -> bool {
        self.stencil
    }

    #[inline]
    pub fn antialias(&self) -> bool {
        self.antialias
    }

    #[inline]
    pub fn dirty_id(&self) -> u32 {
        self.dirty_id
    }

    /// Enables depth + stencil, allocating the attachment if needed.
    pub fn set_stencil(&mut self, stencil: bool) {
        self.stencil = stencil;
        if stencil {
            self.depth = true;
            self.ensure_depth_stencil_texture();
        }
    }

    /// Allocates an owned depth/stencil texture matching color[0], if none exists.
    pub fn ensure_depth_stencil_texture(&mut self) {
        if self.depth_stencil_texture.is_some() {
            return;
        }
        let primary = self.color_texture().source();
        self.depth_stencil_texture = Some(Texture::create(TextureSourceDescriptor {
            width: primary.width(),
            height: primary.height(),
            resolution: primary.resolution(),
            format: TextureFormat::Depth24PlusStencil8,
            antialias: self.antialias,
            label: self.label.as_ref().map(|l| format!("{l} depth-stencil")),
            ..Default::default()
        }));
        self.owns_depth_stencil = true;
    }

    /// Caller-driven resize: resizes every attachment, color[0] included.
    ///
    /// Returns `false` without side effects when the rounded pixel size and the
    /// resolution are unchanged.
    pub fn resize(&mut self, width: f32, height: f32, resolution: Option<f32>) -> bool {
        let primary = self.color_texture().source();
        let resolution = match resolution {
            Some(r) if r > 0.0 => r,
            _ => primary.resolution(),
        };

        let pixel_width = (width * resolution).round().max(0.0) as u32;
        let pixel_height = (height * resolution).round().max(0.0) as u32;
        if pixel_width == primary.pixel_width()
            && pixel_height == primary.pixel_height()
            && resolution == primary.resolution()
        {
            return false;
        }

        self.apply_resize(width, height, resolution, true);
        true
    }

    /// Source-driven resize: color[0] already has its new size, so only the
    /// other attachments are brought in line with it.
    pub fn resize_from_source(&mut self) {
        let primary = self.color_texture().source();
        self.apply_resize(primary.width(), primary.height(), primary.resolution(), false);
    }

    /// Polls color[0] for a resize made behind the target's back.
    ///
    /// Returns `true` if a source-driven resize was applied.
    pub fn sync_with_source(&mut self) -> bool {
        if self.color_texture().source().change_id() == self.observed_change_id {
            return false;
        }
        self.resize_from_source();
        true
    }

    // Skips only index 0 when `resize_primary` is false; the rest always follow.
    fn apply_resize(&mut self, width: f32, height: f32, resolution: f32, resize_primary: bool) {
        for (i, texture) in self.color_textures.iter().enumerate() {
            if i == 0 && !resize_primary {
                continue;
            }
            texture.resize(width, height, Some(resolution));
        }

        if !self.is_root {
            if let Some(ds) = &self.depth_stencil_texture {
                ds.resize(width, height, Some(resolution));
            }
        }

        self.observed_change_id = self.color_texture().source().change_id();
        self.dirty_id = self.dirty_id.wrapping_add(1);
    }

    /// Pixel rectangle covered by color[0]'s frame, floored to whole pixels.
    pub fn viewport(&self) -> PixelRect {
        let primary = self.color_texture();
        let source = primary.source();
        normalized_viewport(primary.normalized_frame(), source.pixel_width(), source.pixel_height())
    }

    /// Orthographic projection for color[0]'s frame. Offscreen targets are flipped.
    pub fn projection_matrix(&self) -> Matrix {
        let frame = self.color_texture().frame();
        calculate_projection(0.0, 0.0, frame.width, frame.height, !self.is_root)
    }

    /// True once color[0]'s source has been destroyed.
    pub fn is_source_destroyed(&self) -> bool {
        self.color_texture().source().is_destroyed()
    }

    /// Releases owned attachments. Consumes the target, so it runs once.
    pub fn destroy(self) {
        if self.owns_color_textures {
            for texture in &self.color_textures {
                texture.destroy(true);
            }
        }
        if self.owns_depth_stencil {
            if let Some(ds) = &self.depth_stencil_texture {
                ds.destroy(true);
            }
        }
    }
}
