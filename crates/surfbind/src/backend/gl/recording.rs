//! A GL stand-in that records calls and tracks just enough state (framebuffer
//! bindings and their clear colors) for read-back assertions.

use std::collections::HashMap;

use super::api::GlApi;

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateFramebuffer(u32),
    DeleteFramebuffer(u32),
    BindFramebuffer { target: u32, framebuffer: Option<u32> },
    DrawBuffers(Vec<u32>),
    ReadBuffer(u32),
    CreateRenderbuffer(u32),
    DeleteRenderbuffer(u32),
    RenderbufferStorage { renderbuffer: u32, samples: u32, format: u32, width: u32, height: u32 },
    FramebufferRenderbuffer { attachment: u32, renderbuffer: Option<u32> },
    CreateTexture(u32),
    DeleteTexture(u32),
    BindTexture { unit: u32, texture: Option<u32> },
    TexImage { width: u32, height: u32, has_pixels: bool },
    FramebufferTexture { attachment: u32, texture: Option<u32> },
    CopyTexSubImage { dst: (i32, i32), src: (i32, i32), size: (i32, i32) },
    Viewport([i32; 4]),
    Scissor(Option<(i32, i32, i32, i32)>),
    ClearColor([f32; 4]),
    Clear(u32),
    Blit { src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32 },
    ReadPixels([i32; 4]),
}

#[derive(Default)]
pub struct RecordingGl {
    pub calls: Vec<GlCall>,
    pub max_samples: u32,
    /// Makes every framebuffer report itself incomplete.
    pub incomplete: bool,

    next_framebuffer: u32,
    next_renderbuffer: u32,
    next_texture: u32,

    draw_framebuffer: Option<u32>,
    read_framebuffer: Option<u32>,
    clear_color: [f32; 4],
    fills: HashMap<Option<u32>, [u8; 4]>,
}

impl RecordingGl {
    pub fn new(max_samples: u32) -> Self {
        Self {
            max_samples,
            ..Default::default()
        }
    }

    pub fn count(&self, pred: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

fn next(counter: &mut u32) -> u32 {
    *counter += 1;
    *counter
}

impl GlApi for RecordingGl {
    type Framebuffer = u32;
    type Renderbuffer = u32;
    type Texture = u32;

    fn max_samples(&mut self) -> u32 {
        self.max_samples
    }

    fn create_framebuffer(&mut self) -> anyhow::Result<u32> {
        let id = next(&mut self.next_framebuffer);
        self.calls.push(GlCall::CreateFramebuffer(id));
        Ok(id)
    }

    fn delete_framebuffer(&mut self, framebuffer: u32) {
        self.fills.remove(&Some(framebuffer));
        self.calls.push(GlCall::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, target: u32, framebuffer: Option<u32>) {
        match target {
            glow::READ_FRAMEBUFFER => self.read_framebuffer = framebuffer,
            glow::DRAW_FRAMEBUFFER => self.draw_framebuffer = framebuffer,
            _ => {
                self.read_framebuffer = framebuffer;
                self.draw_framebuffer = framebuffer;
            }
        }
        self.calls.push(GlCall::BindFramebuffer { target, framebuffer });
    }

    fn check_framebuffer_status(&mut self, _target: u32) -> u32 {
        if self.incomplete {
            glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        } else {
            glow::FRAMEBUFFER_COMPLETE
        }
    }

    fn draw_buffers(&mut self, buffers: &[u32]) {
        self.calls.push(GlCall::DrawBuffers(buffers.to_vec()));
    }

    fn read_buffer(&mut self, src: u32) {
        self.calls.push(GlCall::ReadBuffer(src));
    }

    fn create_renderbuffer(&mut self) -> anyhow::Result<u32> {
        let id = next(&mut self.next_renderbuffer);
        self.calls.push(GlCall::CreateRenderbuffer(id));
        Ok(id)
    }

    fn delete_renderbuffer(&mut self, renderbuffer: u32) {
        self.calls.push(GlCall::DeleteRenderbuffer(renderbuffer));
    }

    fn renderbuffer_storage(&mut self, renderbuffer: u32, samples: u32, format: u32, width: u32, height: u32) {
        self.calls.push(GlCall::RenderbufferStorage {
            renderbuffer,
            samples,
            format,
            width,
            height,
        });
    }

    fn framebuffer_renderbuffer(&mut self, _target: u32, attachment: u32, renderbuffer: Option<u32>) {
        self.calls.push(GlCall::FramebufferRenderbuffer { attachment, renderbuffer });
    }

    fn create_texture(&mut self) -> anyhow::Result<u32> {
        let id = next(&mut self.next_texture);
        self.calls.push(GlCall::CreateTexture(id));
        Ok(id)
    }

    fn delete_texture(&mut self, texture: u32) {
        self.calls.push(GlCall::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<u32>) {
        self.calls.push(GlCall::BindTexture { unit, texture });
    }

    fn tex_image_rgba8(&mut self, width: u32, height: u32, pixels: Option<&[u8]>) {
        self.calls.push(GlCall::TexImage {
            width,
            height,
            has_pixels: pixels.is_some(),
        });
    }

    fn framebuffer_texture_2d(&mut self, _target: u32, attachment: u32, texture: Option<u32>) {
        self.calls.push(GlCall::FramebufferTexture { attachment, texture });
    }

    fn copy_tex_sub_image_2d(&mut self, x_offset: i32, y_offset: i32, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(GlCall::CopyTexSubImage {
            dst: (x_offset, y_offset),
            src: (x, y),
            size: (width, height),
        });
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.calls.push(GlCall::Viewport([x, y, width, height]));
    }

    fn set_scissor(&mut self, rect: Option<(i32, i32, i32, i32)>) {
        self.calls.push(GlCall::Scissor(rect));
    }

    fn clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
        self.calls.push(GlCall::ClearColor(color));
    }

    fn clear(&mut self, mask: u32) {
        if mask & glow::COLOR_BUFFER_BIT != 0 {
            let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
            let [r, g, b, a] = self.clear_color;
            self.fills.insert(self.draw_framebuffer, [q(r), q(g), q(b), q(a)]);
        }
        self.calls.push(GlCall::Clear(mask));
    }

    fn blit_framebuffer(&mut self, src: [i32; 4], dst: [i32; 4], mask: u32, filter: u32) {
        if let Some(fill) = self.fills.get(&self.read_framebuffer).copied() {
            self.fills.insert(self.draw_framebuffer, fill);
        }
        self.calls.push(GlCall::Blit { src, dst, mask, filter });
    }

    fn read_pixels_rgba8(&mut self, x: i32, y: i32, width: i32, height: i32, out: &mut [u8]) {
        let fill = self.fills.get(&self.read_framebuffer).copied().unwrap_or([0; 4]);
        for px in out.chunks_exact_mut(4) {
            px.copy_from_slice(&fill);
        }
        self.calls.push(GlCall::ReadPixels([x, y, width, height]));
    }
}
