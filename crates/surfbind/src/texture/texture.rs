use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::coords::Rect;

use super::{next_uid, TextureSource, TextureSourceDescriptor, TextureStyle};

/// A view over a [`TextureSource`]: an optional sub-rectangle plus sampler style.
///
/// Textures never assume they own their source; several textures (and render
/// targets) may share one. Cloning yields another handle to the same texture.
#[derive(Clone)]
pub struct Texture {
    inner: Rc<RefCell<TextureState>>,
}

struct TextureState {
    uid: u32,
    source: TextureSource,
    /// `None` follows the full source.
    frame: Option<Rect>,
    style: TextureStyle,
    destroyed: bool,
}

impl Texture {
    pub fn new(source: TextureSource) -> Self {
        Self::with_frame(source, None)
    }

    pub fn with_frame(source: TextureSource, frame: Option<Rect>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TextureState {
                uid: next_uid(),
                source,
                frame,
                style: TextureStyle::default(),
                destroyed: false,
            })),
        }
    }

    /// Creates a texture together with a fresh source.
    pub fn create(desc: TextureSourceDescriptor) -> Self {
        Self::new(TextureSource::new(desc))
    }

    fn state(&self) -> Ref<'_, TextureState> {
        self.inner.borrow()
    }

    #[inline]
    pub fn uid(&self) -> u32 {
        self.state().uid
    }

    pub fn source(&self) -> TextureSource {
        self.state().source.clone()
    }

    pub fn set_source(&self, source: TextureSource) {
        self.inner.borrow_mut().source = source;
    }

    /// Sub-rectangle in logical units of the source.
    pub fn frame(&self) -> Rect {
        let s = self.state();
        s.frame
            .unwrap_or_else(|| Rect::from_size(s.source.width(), s.source.height()))
    }

    /// Explicit frame, if one was set.
    pub fn explicit_frame(&self) -> Option<Rect> {
        self.state().frame
    }

    pub fn set_frame(&self, frame: Option<Rect>) {
        self.inner.borrow_mut().frame = frame;
    }

    /// Frame as fractions of the source size.
    pub fn normalized_frame(&self) -> Rect {
        let s = self.state();
        let frame = s
            .frame
            .unwrap_or_else(|| Rect::from_size(s.source.width(), s.source.height()));
        frame.normalized_in(s.source.width(), s.source.height())
    }

    pub fn style(&self) -> TextureStyle {
        self.state().style
    }

    pub fn set_style(&self, style: TextureStyle) {
        self.inner.borrow_mut().style = style;
    }

    /// Batching key combining the sampler style with the source identity.
    ///
    /// Layout: `style:16 | source resource id:16 | source uid:32`. It changes when
    /// the style, the source, or the source's resource id changes, and only then.
    pub fn style_source_key(&self) -> u64 {
        let s = self.state();
        ((s.style.id() as u64) << 48)
            | (((s.source.resource_id() & 0xffff) as u64) << 32)
            | s.source.uid() as u64
    }

    /// Resizes the underlying source. Returns `true` when the pixel size changed.
    pub fn resize(&self, width: f32, height: f32, resolution: Option<f32>) -> bool {
        self.source().resize(width, height, resolution)
    }

    /// Marks the texture destroyed, optionally destroying its source. Idempotent.
    pub fn destroy(&self, destroy_source: bool) {
        let mut s = self.inner.borrow_mut();
        if s.destroyed {
            return;
        }
        s.destroyed = true;
        if destroy_source {
            s.source.destroy();
        }
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Texture {}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.state();
        f.debug_struct("Texture")
            .field("uid", &s.uid)
            .field("source", &s.source)
            .field("frame", &s.frame)
            .field("destroyed", &s.destroyed)
            .finish()
    }
}
