//! Viewport and projection math. Pure functions, no target state.

use crate::coords::{Matrix, PixelRect, Rect};

/// Orthographic projection mapping the `(x, y, width, height)` frame to clip space.
///
/// With `flip_y == false` the frame's top-left maps to `(-1, 1)` (screen
/// convention); with `flip_y == true` it maps to `(-1, -1)`, which is what
/// offscreen textures need so that sampling them later is upright.
pub fn calculate_projection(x: f32, y: f32, width: f32, height: f32, flip_y: bool) -> Matrix {
    let sign = if flip_y { 1.0 } else { -1.0 };

    let a = 2.0 / width;
    let d = sign * (2.0 / height);

    Matrix {
        a,
        b: 0.0,
        c: 0.0,
        d,
        tx: -1.0 - x * a,
        ty: -sign - y * d,
    }
}

/// Projection for a viewport of a target with the given resolution.
pub fn viewport_projection(viewport: PixelRect, resolution: f32, is_root: bool) -> Matrix {
    calculate_projection(
        0.0,
        0.0,
        viewport.width as f32 / resolution,
        viewport.height as f32 / resolution,
        !is_root,
    )
}

/// Converts a logical frame into a device-pixel viewport (rounded to nearest).
#[inline]
pub fn frame_to_viewport(frame: Rect, resolution: f32) -> PixelRect {
    frame.to_pixels(resolution)
}

/// Viewport covering `normalized_frame` of a `pixel_width` x `pixel_height` target,
/// floored to whole pixels.
pub fn normalized_viewport(normalized_frame: Rect, pixel_width: u32, pixel_height: u32) -> PixelRect {
    let pw = pixel_width as f32;
    let ph = pixel_height as f32;
    PixelRect::new(
        (normalized_frame.x * pw).floor() as i32,
        (normalized_frame.y * ph).floor() as i32,
        (normalized_frame.width * pw).floor() as i32,
        (normalized_frame.height * ph).floor() as i32,
    )
}
