//! The slice of OpenGL (ES 3.0 level) used by the GL adaptor.
//!
//! Kept as a trait so the adaptor's call sequences can be exercised against a
//! recording implementation; `glow::Context` is the production implementation.

use std::fmt::Debug;

use anyhow::anyhow;
use glow::HasContext;

pub trait GlApi {
    type Framebuffer: Copy + Debug + Eq;
    type Renderbuffer: Copy + Debug + Eq;
    type Texture: Copy + Debug + Eq;

    /// `GL_MAX_SAMPLES`.
    fn max_samples(&mut self) -> u32;

    fn create_framebuffer(&mut self) -> anyhow::Result<Self::Framebuffer>;
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);
    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<Self::Framebuffer>);
    fn check_framebuffer_status(&mut self, target: u32) -> u32;
    fn draw_buffers(&mut self, buffers: &[u32]);
    fn read_buffer(&mut self, src: u32);

    fn create_renderbuffer(&mut self) -> anyhow::Result<Self::Renderbuffer>;
    fn delete_renderbuffer(&mut self, renderbuffer: Self::Renderbuffer);
    /// Binds `renderbuffer` and (re)allocates its storage; `samples <= 1` means single-sampled.
    fn renderbuffer_storage(
        &mut self,
        renderbuffer: Self::Renderbuffer,
        samples: u32,
        internal_format: u32,
        width: u32,
        height: u32,
    );
    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer: Option<Self::Renderbuffer>,
    );

    fn create_texture(&mut self) -> anyhow::Result<Self::Texture>;
    fn delete_texture(&mut self, texture: Self::Texture);
    /// Makes `unit` active and binds `texture` to its 2D slot.
    fn bind_texture(&mut self, unit: u32, texture: Option<Self::Texture>);
    /// (Re)allocates RGBA8 storage for the texture bound on the active unit.
    fn tex_image_rgba8(&mut self, width: u32, height: u32, pixels: Option<&[u8]>);
    fn framebuffer_texture_2d(&mut self, target: u32, attachment: u32, texture: Option<Self::Texture>);
    /// Copies from the read framebuffer into the texture bound on the active unit.
    fn copy_tex_sub_image_2d(&mut self, x_offset: i32, y_offset: i32, x: i32, y: i32, width: i32, height: i32);

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn set_scissor(&mut self, rect: Option<(i32, i32, i32, i32)>);
    fn clear_color(&mut self, color: [f32; 4]);
    fn clear(&mut self, mask: u32);

    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32);

    /// Reads RGBA8 rows (bottom-up, GL order) from the read framebuffer.
    fn read_pixels_rgba8(&mut self, x: i32, y: i32, width: i32, height: i32, out: &mut [u8]);
}

// SAFETY (all methods below): glow exposes raw GL calls as unsafe. Every handle
// passed in was created by this same context, and callers keep the context
// current on this thread.
impl GlApi for glow::Context {
    type Framebuffer = glow::Framebuffer;
    type Renderbuffer = glow::Renderbuffer;
    type Texture = glow::Texture;

    fn max_samples(&mut self) -> u32 {
        let samples = unsafe { self.get_parameter_i32(glow::MAX_SAMPLES) };
        samples.max(1) as u32
    }

    fn create_framebuffer(&mut self) -> anyhow::Result<glow::Framebuffer> {
        unsafe { HasContext::create_framebuffer(self) }.map_err(|e| anyhow!("glCreateFramebuffer: {e}"))
    }

    fn delete_framebuffer(&mut self, framebuffer: glow::Framebuffer) {
        unsafe { HasContext::delete_framebuffer(self, framebuffer) }
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<glow::Framebuffer>) {
        unsafe { HasContext::bind_framebuffer(self, target, framebuffer) }
    }

    fn check_framebuffer_status(&mut self, target: u32) -> u32 {
        unsafe { HasContext::check_framebuffer_status(self, target) }
    }

    fn draw_buffers(&mut self, buffers: &[u32]) {
        unsafe { HasContext::draw_buffers(self, buffers) }
    }

    fn read_buffer(&mut self, src: u32) {
        unsafe { HasContext::read_buffer(self, src) }
    }

    fn create_renderbuffer(&mut self) -> anyhow::Result<glow::Renderbuffer> {
        unsafe { HasContext::create_renderbuffer(self) }.map_err(|e| anyhow!("glCreateRenderbuffer: {e}"))
    }

    fn delete_renderbuffer(&mut self, renderbuffer: glow::Renderbuffer) {
        unsafe { HasContext::delete_renderbuffer(self, renderbuffer) }
    }

    fn renderbuffer_storage(
        &mut self,
        renderbuffer: glow::Renderbuffer,
        samples: u32,
        internal_format: u32,
        width: u32,
        height: u32,
    ) {
        unsafe {
            HasContext::bind_renderbuffer(self, glow::RENDERBUFFER, Some(renderbuffer));
            if samples > 1 {
                HasContext::renderbuffer_storage_multisample(
                    self,
                    glow::RENDERBUFFER,
                    samples as i32,
                    internal_format,
                    width as i32,
                    height as i32,
                );
            } else {
                HasContext::renderbuffer_storage(
                    self,
                    glow::RENDERBUFFER,
                    internal_format,
                    width as i32,
                    height as i32,
                );
            }
            HasContext::bind_renderbuffer(self, glow::RENDERBUFFER, None);
        }
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: u32,
        attachment: u32,
        renderbuffer: Option<glow::Renderbuffer>,
    ) {
        unsafe {
            HasContext::framebuffer_renderbuffer(self, target, attachment, glow::RENDERBUFFER, renderbuffer)
        }
    }

    fn create_texture(&mut self) -> anyhow::Result<glow::Texture> {
        unsafe { HasContext::create_texture(self) }.map_err(|e| anyhow!("glCreateTexture: {e}"))
    }

    fn delete_texture(&mut self, texture: glow::Texture) {
        unsafe { HasContext::delete_texture(self, texture) }
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<glow::Texture>) {
        unsafe {
            HasContext::active_texture(self, glow::TEXTURE0 + unit);
            HasContext::bind_texture(self, glow::TEXTURE_2D, texture);
        }
    }

    fn tex_image_rgba8(&mut self, width: u32, height: u32, pixels: Option<&[u8]>) {
        unsafe {
            HasContext::tex_image_2d(
                self,
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(pixels),
            );
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            HasContext::tex_parameter_i32(self, glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        }
    }

    fn framebuffer_texture_2d(&mut self, target: u32, attachment: u32, texture: Option<glow::Texture>) {
        unsafe { HasContext::framebuffer_texture_2d(self, target, attachment, glow::TEXTURE_2D, texture, 0) }
    }

    fn copy_tex_sub_image_2d(&mut self, x_offset: i32, y_offset: i32, x: i32, y: i32, width: i32, height: i32) {
        unsafe {
            HasContext::copy_tex_sub_image_2d(self, glow::TEXTURE_2D, 0, x_offset, y_offset, x, y, width, height)
        }
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }

    fn set_scissor(&mut self, rect: Option<(i32, i32, i32, i32)>) {
        unsafe {
            match rect {
                Some((x, y, w, h)) => {
                    HasContext::enable(self, glow::SCISSOR_TEST);
                    HasContext::scissor(self, x, y, w, h);
                }
                None => HasContext::disable(self, glow::SCISSOR_TEST),
            }
        }
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        let [r, g, b, a] = color;
        unsafe { HasContext::clear_color(self, r, g, b, a) }
    }

    fn clear(&mut self, mask: u32) {
        unsafe { HasContext::clear(self, mask) }
    }

    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32) {
        unsafe {
            HasContext::blit_framebuffer(
                self, src[0], src[1], src[2], src[3], dst[0], dst[1], dst[2], dst[3], mask, filter,
            )
        }
    }

    fn read_pixels_rgba8(&mut self, x: i32, y: i32, width: i32, height: i32, out: &mut [u8]) {
        unsafe {
            HasContext::read_pixels(
                self,
                x,
                y,
                width,
                height,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(out)),
            )
        }
    }
}
