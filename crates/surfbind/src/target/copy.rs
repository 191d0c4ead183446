/// A validated pixel copy: `width` x `height` from `src_*` to `dst_*`.
///
/// All fields are non-negative and the source rectangle lies inside the source.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CopyRegion {
    pub src_x: u32,
    pub src_y: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clamps a requested copy to the source bounds.
///
/// A negative source origin shrinks the copy by the overhang and shifts the
/// destination origin forward by the same amount. A negative destination origin
/// is treated the same way, shifting the source origin forward instead. The size
/// is then limited to what remains of the source. Returns `None` when nothing
/// is left to copy.
pub fn clamp_copy_region(
    origin_src: (i32, i32),
    size: (i32, i32),
    origin_dest: (i32, i32),
    source_pixel_size: (u32, u32),
) -> Option<CopyRegion> {
    // Widened so extreme inputs cannot overflow.
    let (mut sx, mut sy) = (i64::from(origin_src.0), i64::from(origin_src.1));
    let (mut w, mut h) = (i64::from(size.0), i64::from(size.1));
    let (mut dx, mut dy) = (i64::from(origin_dest.0), i64::from(origin_dest.1));

    if sx < 0 {
        w += sx;
        dx -= sx;
        sx = 0;
    }
    if sy < 0 {
        h += sy;
        dy -= sy;
        sy = 0;
    }
    if dx < 0 {
        w += dx;
        sx -= dx;
        dx = 0;
    }
    if dy < 0 {
        h += dy;
        sy -= dy;
        dy = 0;
    }

    w = w.min(i64::from(source_pixel_size.0) - sx);
    h = h.min(i64::from(source_pixel_size.1) - sy);
    if w <= 0 || h <= 0 {
        return None;
    }

    Some(CopyRegion {
        src_x: u32::try_from(sx).ok()?,
        src_y: u32::try_from(sy).ok()?,
        dst_x: u32::try_from(dx).ok()?,
        dst_y: u32::try_from(dy).ok()?,
        width: u32::try_from(w).ok()?,
        height: u32::try_from(h).ok()?,
    })
}
