use crate::coords::{ColorRgba, PixelRect};
use crate::system::PassRequest;
use crate::target::Clear;

/// Load/store decisions for one wgpu render pass.
///
/// wgpu clears through load ops, so a bind with a clear mask and a bind without
/// one differ only here.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassPlan {
    pub color_load: wgpu::LoadOp<wgpu::Color>,
    /// `None` when the target has no depth/stencil attachment.
    pub depth_load: Option<wgpu::LoadOp<f32>>,
    pub stencil_load: Option<wgpu::LoadOp<u32>>,
    /// `(x, y, width, height)`, clamped to the attachment.
    pub viewport: Option<[f32; 4]>,
}

impl PassPlan {
    pub fn new(pass: &PassRequest, has_depth_stencil: bool, pixel_size: (u32, u32)) -> Self {
        let color_load = if pass.clear.contains(Clear::COLOR) {
            wgpu::LoadOp::Clear(to_wgpu_color(pass.clear_color))
        } else {
            wgpu::LoadOp::Load
        };

        let (depth_load, stencil_load) = if has_depth_stencil {
            let depth = if pass.clear.contains(Clear::DEPTH) {
                wgpu::LoadOp::Clear(1.0)
            } else {
                wgpu::LoadOp::Load
            };
            let stencil = if pass.clear.contains(Clear::STENCIL) {
                wgpu::LoadOp::Clear(0)
            } else {
                wgpu::LoadOp::Load
            };
            (Some(depth), Some(stencil))
        } else {
            (None, None)
        };

        Self {
            color_load,
            depth_load,
            stencil_load,
            viewport: clamp_viewport(pass.viewport, pixel_size),
        }
    }

    /// Same attachments, nothing cleared. Used to reopen a pass after copies.
    pub fn reload(&self) -> Self {
        Self {
            color_load: wgpu::LoadOp::Load,
            depth_load: self.depth_load.map(|_| wgpu::LoadOp::Load),
            stencil_load: self.stencil_load.map(|_| wgpu::LoadOp::Load),
            viewport: self.viewport,
        }
    }

    pub fn color_ops(&self) -> wgpu::Operations<wgpu::Color> {
        wgpu::Operations {
            load: self.color_load,
            store: wgpu::StoreOp::Store,
        }
    }

    pub fn depth_ops(&self) -> Option<wgpu::Operations<f32>> {
        self.depth_load.map(|load| wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        })
    }

    pub fn stencil_ops(&self) -> Option<wgpu::Operations<u32>> {
        self.stencil_load.map(|load| wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        })
    }
}

fn to_wgpu_color(c: ColorRgba) -> wgpu::Color {
    wgpu::Color {
        r: c.r as f64,
        g: c.g as f64,
        b: c.b as f64,
        a: c.a as f64,
    }
}

// wgpu rejects viewports reaching outside the attachment.
fn clamp_viewport(rect: PixelRect, (pw, ph): (u32, u32)) -> Option<[f32; 4]> {
    let x0 = rect.x.clamp(0, pw as i32);
    let y0 = rect.y.clamp(0, ph as i32);
    let x1 = (rect.x + rect.width).clamp(0, pw as i32);
    let y1 = (rect.y + rect.height).clamp(0, ph as i32);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some([x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(clear: Clear) -> PassRequest {
        PassRequest {
            clear,
            clear_color: ColorRgba::new(1.0, 0.0, 0.0, 1.0),
            viewport: PixelRect::from_size(64, 64),
        }
    }

    #[test]
    fn clear_mask_selects_load_ops() {
        let p = PassPlan::new(&request(Clear::ALL), true, (64, 64));
        assert!(matches!(p.color_load, wgpu::LoadOp::Clear(c) if c.r == 1.0));
        assert_eq!(p.depth_load, Some(wgpu::LoadOp::Clear(1.0)));
        assert_eq!(p.stencil_load, Some(wgpu::LoadOp::Clear(0)));

        let p = PassPlan::new(&request(Clear::STENCIL), true, (64, 64));
        assert_eq!(p.color_load, wgpu::LoadOp::Load);
        assert_eq!(p.depth_load, Some(wgpu::LoadOp::Load));
        assert_eq!(p.stencil_load, Some(wgpu::LoadOp::Clear(0)));
    }

    #[test]
    fn no_depth_attachment_no_depth_ops() {
        let p = PassPlan::new(&request(Clear::ALL), false, (64, 64));
        assert!(p.depth_ops().is_none());
        assert!(p.stencil_ops().is_none());
    }

    #[test]
    fn reload_keeps_everything_but_clears() {
        let p = PassPlan::new(&request(Clear::ALL), true, (64, 64)).reload();
        assert_eq!(p.color_load, wgpu::LoadOp::Load);
        assert_eq!(p.depth_load, Some(wgpu::LoadOp::Load));
        assert_eq!(p.viewport, Some([0.0, 0.0, 64.0, 64.0]));
    }

    #[test]
    fn viewport_is_clamped_to_attachment() {
        let mut r = request(Clear::NONE);
        r.viewport = PixelRect::new(-10, 50, 100, 100);
        assert_eq!(PassPlan::new(&r, false, (64, 64)).viewport, Some([0.0, 50.0, 64.0, 14.0]));

        r.viewport = PixelRect::new(100, 100, 10, 10);
        assert_eq!(PassPlan::new(&r, false, (64, 64)).viewport, None);
    }
}
