use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::{next_uid, Texture, TextureFormat, TextureSource};

/// Handle to a presentable surface (a window's swapchain, the GL default framebuffer).
///
/// The platform layer owns the actual window; this handle only reports the current
/// drawable size and whether the surface is on screen. Clones share state.
#[derive(Clone)]
pub struct Canvas {
    inner: Rc<CanvasState>,
}

struct CanvasState {
    uid: u32,
    pixel_width: Cell<u32>,
    pixel_height: Cell<u32>,
    presented: Cell<bool>,
    destroyed: Cell<bool>,
}

impl Canvas {
    pub fn new(pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            inner: Rc::new(CanvasState {
                uid: next_uid(),
                pixel_width: Cell::new(pixel_width),
                pixel_height: Cell::new(pixel_height),
                presented: Cell::new(true),
                destroyed: Cell::new(false),
            }),
        }
    }

    #[inline]
    pub fn uid(&self) -> u32 {
        self.inner.uid
    }

    #[inline]
    pub fn pixel_width(&self) -> u32 {
        self.inner.pixel_width.get()
    }

    #[inline]
    pub fn pixel_height(&self) -> u32 {
        self.inner.pixel_height.get()
    }

    /// Records a new drawable size (typically from a window resize event).
    pub fn set_pixel_size(&self, pixel_width: u32, pixel_height: u32) {
        self.inner.pixel_width.set(pixel_width);
        self.inner.pixel_height.set(pixel_height);
    }

    #[inline]
    pub fn is_presented(&self) -> bool {
        self.inner.presented.get() && !self.is_destroyed()
    }

    pub fn set_presented(&self, presented: bool) {
        self.inner.presented.set(presented);
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Marks the surface as gone. Idempotent.
    pub fn destroy(&self) {
        self.inner.destroyed.set(true);
    }
}

impl PartialEq for Canvas {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Canvas {}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("uid", &self.uid())
            .field("pixel_width", &self.pixel_width())
            .field("pixel_height", &self.pixel_height())
            .field("presented", &self.inner.presented.get())
            .finish()
    }
}

/// Options used when wrapping a canvas into a texture.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CanvasTextureOptions {
    /// Device pixel ratio of the surface.
    pub resolution: f32,
    /// Request multisampling for the surface.
    pub antialias: bool,
    pub format: TextureFormat,
}

impl Default for CanvasTextureOptions {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            antialias: false,
            format: TextureFormat::Bgra8UnormSrgb,
        }
    }
}

/// Canonical canvas → texture mapping.
///
/// Exactly one texture exists per live canvas. The cache owns the sources it creates
/// and destroys them when their canvas goes away.
#[derive(Debug, Default)]
pub struct CanvasTextureCache {
    entries: HashMap<u32, Texture>,
}

impl CanvasTextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the texture wrapping `canvas`, creating it on first use.
    ///
    /// The texture source is kept at the canvas' current drawable size.
    pub fn get_canvas_texture(&mut self, canvas: &Canvas, options: CanvasTextureOptions) -> Texture {
        if let Some(texture) = self.entries.get(&canvas.uid()) {
            if !texture.source().is_destroyed() {
                sync_canvas_size(texture, canvas);
                return texture.clone();
            }
        }

        let source = TextureSource::from_canvas(canvas, options);
        let texture = Texture::new(source);
        log::debug!("canvas texture created (canvas {}, texture {})", canvas.uid(), texture.uid());
        self.entries.insert(canvas.uid(), texture.clone());
        texture
    }

    /// Drops entries whose canvas was destroyed, destroying the sources created for them.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, texture| {
            let canvas_gone = texture.source().canvas().is_none_or(|c| c.is_destroyed());
            if canvas_gone {
                texture.destroy(true);
            }
            !canvas_gone
        });
        before - self.entries.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn sync_canvas_size(texture: &Texture, canvas: &Canvas) {
    let source = texture.source();
    if source.pixel_width() == canvas.pixel_width() && source.pixel_height() == canvas.pixel_height() {
        return;
    }
    let res = source.resolution();
    source.resize(
        canvas.pixel_width() as f32 / res,
        canvas.pixel_height() as f32 / res,
        None,
    );
}
