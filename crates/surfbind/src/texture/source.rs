use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use super::{next_uid, Canvas, CanvasTextureOptions, TextureFormat};

/// Backing payload of a texture source.
#[derive(Debug, Clone, Default)]
pub enum SourceResource {
    /// GPU-only storage (render textures, depth buffers).
    #[default]
    None,
    /// Tightly packed pixel rows, uploaded on first use.
    Pixels(Vec<u8>),
    /// A presentable surface.
    Canvas(Canvas),
}

/// Parameters for creating a [`TextureSource`].
#[derive(Debug, Clone)]
pub struct TextureSourceDescriptor {
    /// Logical width (device pixels / resolution).
    pub width: f32,
    /// Logical height (device pixels / resolution).
    pub height: f32,
    pub resolution: f32,
    pub format: TextureFormat,
    pub antialias: bool,
    pub sample_count: u32,
    pub resource: SourceResource,
    pub label: Option<String>,
}

impl Default for TextureSourceDescriptor {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            resolution: 1.0,
            format: TextureFormat::default(),
            antialias: false,
            sample_count: 1,
            resource: SourceResource::None,
            label: None,
        }
    }
}

/// Pixel storage shared between textures, render targets and backends.
///
/// Cloning yields another handle to the same source. Pixel dimensions are
/// authoritative; logical `width`/`height` are always derived from them so
/// repeated resizes never accumulate fractional drift.
///
/// Observers poll instead of subscribing:
/// - `change_id` advances on every effective resize
/// - `update_id` advances on every content change (resize included)
/// - `resource_id` advances on every structural invalidation (resize, unload, destroy)
#[derive(Clone)]
pub struct TextureSource {
    inner: Rc<RefCell<SourceState>>,
}

struct SourceState {
    uid: u32,
    label: Option<String>,
    pixel_width: u32,
    pixel_height: u32,
    width: f32,
    height: f32,
    resolution: f32,
    format: TextureFormat,
    antialias: bool,
    sample_count: u32,
    resource: SourceResource,
    resource_id: u32,
    update_id: u32,
    change_id: u32,
    destroyed: bool,
}

impl TextureSource {
    pub fn new(desc: TextureSourceDescriptor) -> Self {
        let resolution = if desc.resolution > 0.0 { desc.resolution } else { 1.0 };
        let pixel_width = to_pixels(desc.width, resolution);
        let pixel_height = to_pixels(desc.height, resolution);

        Self {
            inner: Rc::new(RefCell::new(SourceState {
                uid: next_uid(),
                label: desc.label,
                pixel_width,
                pixel_height,
                width: pixel_width as f32 / resolution,
                height: pixel_height as f32 / resolution,
                resolution,
                format: desc.format,
                antialias: desc.antialias,
                sample_count: desc.sample_count.max(1),
                resource: desc.resource,
                resource_id: 0,
                update_id: 0,
                change_id: 0,
                destroyed: false,
            })),
        }
    }

    /// Wraps a presentable surface at its current drawable size.
    pub fn from_canvas(canvas: &Canvas, options: CanvasTextureOptions) -> Self {
        let resolution = if options.resolution > 0.0 { options.resolution } else { 1.0 };
        Self::new(TextureSourceDescriptor {
            width: canvas.pixel_width() as f32 / resolution,
            height: canvas.pixel_height() as f32 / resolution,
            resolution,
            format: options.format,
            antialias: options.antialias,
            sample_count: 1,
            resource: SourceResource::Canvas(canvas.clone()),
            label: Some(format!("canvas {}", canvas.uid())),
        })
    }

    fn state(&self) -> Ref<'_, SourceState> {
        self.inner.borrow()
    }

    #[inline]
    pub fn uid(&self) -> u32 {
        self.state().uid
    }

    pub fn label(&self) -> Option<String> {
        self.state().label.clone()
    }

    #[inline]
    pub fn pixel_width(&self) -> u32 {
        self.state().pixel_width
    }

    #[inline]
    pub fn pixel_height(&self) -> u32 {
        self.state().pixel_height
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.state().width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.state().height
    }

    #[inline]
    pub fn resolution(&self) -> f32 {
        self.state().resolution
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.state().format
    }

    #[inline]
    pub fn antialias(&self) -> bool {
        self.state().antialias
    }

    pub fn set_antialias(&self, antialias: bool) {
        self.inner.borrow_mut().antialias = antialias;
    }

    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.state().sample_count
    }

    pub fn set_sample_count(&self, sample_count: u32) {
        self.inner.borrow_mut().sample_count = sample_count.max(1);
    }

    #[inline]
    pub fn resource_id(&self) -> u32 {
        self.state().resource_id
    }

    #[inline]
    pub fn update_id(&self) -> u32 {
        self.state().update_id
    }

    #[inline]
    pub fn change_id(&self) -> u32 {
        self.state().change_id
    }

    /// True when the resource is a presentable surface.
    #[inline]
    pub fn is_screen(&self) -> bool {
        matches!(self.state().resource, SourceResource::Canvas(_))
    }

    pub fn canvas(&self) -> Option<Canvas> {
        match &self.state().resource {
            SourceResource::Canvas(c) => Some(c.clone()),
            _ => None,
        }
    }

    /// Runs `f` with the raw pixels of a `Pixels` resource, if any.
    pub fn with_pixels<R>(&self, f: impl FnOnce(Option<&[u8]>) -> R) -> R {
        match &self.state().resource {
            SourceResource::Pixels(p) => f(Some(p.as_slice())),
            _ => f(None),
        }
    }

    /// Replaces the pixel payload and marks the content dirty.
    pub fn set_pixels(&self, pixels: Vec<u8>) {
        let mut s = self.inner.borrow_mut();
        s.resource = SourceResource::Pixels(pixels);
        s.update_id = s.update_id.wrapping_add(1);
    }

    /// Resizes to `width` x `height` logical units at `resolution` (current when `None`).
    ///
    /// Pixel sizes are rounded first and the logical size recomputed from them.
    /// Returns `false`, without touching any counter, when the rounded pixel size
    /// is unchanged.
    pub fn resize(&self, width: f32, height: f32, resolution: Option<f32>) -> bool {
        let mut s = self.inner.borrow_mut();
        let resolution = match resolution {
            Some(r) if r > 0.0 => r,
            _ => s.resolution,
        };

        let pixel_width = to_pixels(width, resolution);
        let pixel_height = to_pixels(height, resolution);

        s.resolution = resolution;
        s.width = pixel_width as f32 / resolution;
        s.height = pixel_height as f32 / resolution;

        if s.pixel_width == pixel_width && s.pixel_height == pixel_height {
            return false;
        }

        s.pixel_width = pixel_width;
        s.pixel_height = pixel_height;
        s.change_id = s.change_id.wrapping_add(1);
        s.update_id = s.update_id.wrapping_add(1);
        s.resource_id = s.resource_id.wrapping_add(1);
        true
    }

    /// Marks the content as changed.
    pub fn update(&self) {
        let mut s = self.inner.borrow_mut();
        s.update_id = s.update_id.wrapping_add(1);
    }

    /// Invalidates any GPU-side copies; the next use re-creates them.
    pub fn unload(&self) {
        let mut s = self.inner.borrow_mut();
        s.resource_id = s.resource_id.wrapping_add(1);
    }

    /// Releases the resource. Idempotent.
    pub fn destroy(&self) {
        let mut s = self.inner.borrow_mut();
        if s.destroyed {
            return;
        }
        s.destroyed = true;
        s.resource = SourceResource::None;
        s.resource_id = s.resource_id.wrapping_add(1);
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }
}

#[inline]
fn to_pixels(v: f32, resolution: f32) -> u32 {
    (v * resolution).round().max(0.0) as u32
}

impl PartialEq for TextureSource {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for TextureSource {}

impl fmt::Debug for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.state();
        f.debug_struct("TextureSource")
            .field("uid", &s.uid)
            .field("label", &s.label)
            .field("pixel_width", &s.pixel_width)
            .field("pixel_height", &s.pixel_height)
            .field("resolution", &s.resolution)
            .field("format", &s.format)
            .field("antialias", &s.antialias)
            .field("destroyed", &s.destroyed)
            .finish()
    }
}
