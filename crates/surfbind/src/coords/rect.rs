/// Axis-aligned rectangle in logical units (top-left origin).
///
/// Logical units are device pixels divided by the owning source's resolution.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle anchored at the origin.
    #[inline]
    pub const fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Expresses this rectangle as fractions of a `width` x `height` area.
    ///
    /// A zero-sized area yields the full unit rectangle.
    pub fn normalized_in(self, width: f32, height: f32) -> Rect {
        if width <= 0.0 || height <= 0.0 {
            return Rect::from_size(1.0, 1.0);
        }
        Rect::new(
            self.x / width,
            self.y / height,
            self.width / width,
            self.height / height,
        )
    }

    /// Converts to device pixels, rounding each component to the nearest pixel.
    #[inline]
    pub fn to_pixels(self, resolution: f32) -> PixelRect {
        PixelRect::new(
            round_px(self.x * resolution),
            round_px(self.y * resolution),
            round_px(self.width * resolution),
            round_px(self.height * resolution),
        )
    }
}

#[inline]
fn round_px(v: f32) -> i32 {
    (v + 0.5).floor() as i32
}

/// Axis-aligned rectangle in device pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}
