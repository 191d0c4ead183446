use std::collections::HashMap;

use anyhow::{bail, Context};

use crate::coords::PixelRect;
use crate::system::{GpuTargetOptions, PassRequest, RenderTargetAdaptor};
use crate::target::{Clear, CopyRegion, RenderTarget};
use crate::texture::{Texture, TextureSource};

use super::api::GlApi;
use super::target::GlRenderTarget;

/// GL adaptor configuration.
#[derive(Debug, Clone)]
pub struct GlAdaptorConfig {
    /// Upper bound on MSAA samples, applied on top of `GL_MAX_SAMPLES`.
    pub max_sample_count: u32,

    /// Number of texture units tracked for `bind_texture`/`unbind_texture`.
    pub texture_units: u32,
}

impl Default for GlAdaptorConfig {
    fn default() -> Self {
        Self {
            max_sample_count: 4,
            texture_units: 16,
        }
    }
}

struct TextureEntry<T> {
    texture: T,
    source: TextureSource,
    pixel_width: u32,
    pixel_height: u32,
    update_id: u32,
}

/// Render-target adaptor for OpenGL ES 3.0 / WebGL2-class contexts.
///
/// Owns the GL texture table (keyed by texture source) because color attachments
/// are plain GL textures that the rest of a renderer samples from.
pub struct GlRenderTargetAdaptor<A: GlApi> {
    gl: A,
    config: GlAdaptorConfig,
    max_samples: u32,

    textures: HashMap<u32, TextureEntry<A::Texture>>,
    /// Source uid bound on each texture unit.
    bound_textures: Vec<Option<u32>>,

    /// Framebuffer established by the last `start_render_pass`; `Some(None)` is
    /// the default framebuffer. Restored after work on any other target.
    pass_framebuffer: Option<Option<A::Framebuffer>>,

    // Redundant-state caches; reset at the start of every frame.
    viewport: Option<[i32; 4]>,
    clear_color: Option<[f32; 4]>,
}

impl<A: GlApi> GlRenderTargetAdaptor<A> {
    pub fn new(mut gl: A, config: GlAdaptorConfig) -> Self {
        let max_samples = gl.max_samples().min(config.max_sample_count).max(1);
        log::debug!("gl adaptor: max MSAA samples {max_samples}");

        Self {
            gl,
            bound_textures: vec![None; config.texture_units as usize],
            config,
            max_samples,
            textures: HashMap::new(),
            pass_framebuffer: None,
            viewport: None,
            clear_color: None,
        }
    }

    pub fn gl(&self) -> &A {
        &self.gl
    }

    pub fn gl_mut(&mut self) -> &mut A {
        &mut self.gl
    }

    pub fn config(&self) -> &GlAdaptorConfig {
        &self.config
    }

    /// Number of live GL textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Returns the GL texture for `source`, creating or refreshing its storage.
    ///
    /// Storage is reallocated on a pixel-size change; pixel payloads are
    /// re-uploaded when the source's content changed.
    pub fn gl_texture(&mut self, source: &TextureSource) -> anyhow::Result<A::Texture> {
        let uid = source.uid();
        let (pw, ph) = (source.pixel_width(), source.pixel_height());
        let update_id = source.update_id();
        let has_pixels = source.with_pixels(|p| p.is_some());

        let texture = match self.textures.get_mut(&uid) {
            Some(entry) => {
                let resized = entry.pixel_width != pw || entry.pixel_height != ph;
                let reupload = has_pixels && entry.update_id != update_id;
                entry.pixel_width = pw;
                entry.pixel_height = ph;
                entry.update_id = update_id;
                if !resized && !reupload {
                    return Ok(entry.texture);
                }
                entry.texture
            }
            None => {
                let texture = self.gl.create_texture().context("failed to create GL texture")?;
                self.textures.insert(
                    uid,
                    TextureEntry {
                        texture,
                        source: source.clone(),
                        pixel_width: pw,
                        pixel_height: ph,
                        update_id,
                    },
                );
                texture
            }
        };

        self.bind_unit(0, uid, texture);
        let expected = pw as usize * ph as usize * 4;
        source.with_pixels(|pixels| {
            let pixels = pixels.filter(|p| p.len() == expected);
            self.gl.tex_image_rgba8(pw.max(1), ph.max(1), pixels);
        });
        Ok(texture)
    }

    /// Binds `texture` for sampling on `unit`.
    pub fn bind_texture(&mut self, texture: &Texture, unit: u32) -> anyhow::Result<()> {
        if unit as usize >= self.bound_textures.len() {
            bail!("texture unit {unit} out of range ({} tracked)", self.bound_textures.len());
        }
        let source = texture.source();
        let gl_texture = self.gl_texture(&source)?;
        self.bind_unit(unit, source.uid(), gl_texture);
        Ok(())
    }

    fn bind_unit(&mut self, unit: u32, uid: u32, texture: A::Texture) {
        self.gl.bind_texture(unit, Some(texture));
        if let Some(slot) = self.bound_textures.get_mut(unit as usize) {
            *slot = Some(uid);
        }
    }

    /// Deletes the GL texture of `source`, if any.
    pub fn release_texture(&mut self, source: &TextureSource) {
        let uid = source.uid();
        if let Some(entry) = self.textures.remove(&uid) {
            self.forget_bindings(uid);
            self.gl.delete_texture(entry.texture);
        }
    }

    /// Deletes textures whose sources were destroyed. Returns how many were released.
    pub fn release_destroyed_textures(&mut self) -> usize {
        let dead: Vec<u32> = self
            .textures
            .iter()
            .filter(|(_, e)| e.source.is_destroyed())
            .map(|(&uid, _)| uid)
            .collect();

        for &uid in &dead {
            if let Some(entry) = self.textures.remove(&uid) {
                self.forget_bindings(uid);
                self.gl.delete_texture(entry.texture);
            }
        }
        if !dead.is_empty() {
            log::debug!("gl adaptor: released {} texture(s) of destroyed sources", dead.len());
        }
        dead.len()
    }

    fn forget_bindings(&mut self, uid: u32) {
        for (unit, slot) in self.bound_textures.iter_mut().enumerate() {
            if *slot == Some(uid) {
                self.gl.bind_texture(unit as u32, None);
                *slot = None;
            }
        }
    }

    fn check_complete(&mut self, what: &str) -> anyhow::Result<()> {
        let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
        if status != glow::FRAMEBUFFER_COMPLETE {
            bail!("{what} framebuffer incomplete (status 0x{status:x})");
        }
        Ok(())
    }

    fn build_offscreen(
        &mut self,
        target: &RenderTarget,
        options: GpuTargetOptions,
        gpu: &mut GlRenderTarget<A>,
    ) -> anyhow::Result<()> {
        let (w, h) = (gpu.pixel_width.max(1), gpu.pixel_height.max(1));
        let attachments = color_attachments(gpu.color_count);

        let resolve = self.gl.create_framebuffer().context("failed to create GL framebuffer")?;
        gpu.resolve_framebuffer = Some(resolve);
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(resolve));
        for (texture, &attachment) in target.color_textures().iter().zip(&attachments) {
            let gl_texture = self.gl_texture(&texture.source())?;
            self.gl.framebuffer_texture_2d(glow::FRAMEBUFFER, attachment, Some(gl_texture));
        }
        self.gl.draw_buffers(&attachments);
        self.check_complete("resolve")?;

        if options.msaa() {
            let msaa = self.gl.create_framebuffer().context("failed to create GL MSAA framebuffer")?;
            gpu.msaa_framebuffer = Some(msaa);
            gpu.sample_count = options.sample_count;
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(msaa));

            for &attachment in &attachments {
                let rb = self.gl.create_renderbuffer().context("failed to create GL renderbuffer")?;
                gpu.msaa_renderbuffers.push(rb);
                self.gl.renderbuffer_storage(rb, gpu.sample_count, glow::RGBA8, w, h);
                self.gl.framebuffer_renderbuffer(glow::FRAMEBUFFER, attachment, Some(rb));
            }
            self.gl.draw_buffers(&attachments);
            self.check_complete("multisample")?;
        }

        if target.depth() || target.stencil() {
            self.attach_depth_stencil(gpu)?;
        }
        Ok(())
    }

    fn attach_depth_stencil(&mut self, gpu: &mut GlRenderTarget<A>) -> anyhow::Result<()> {
        let rb = self
            .gl
            .create_renderbuffer()
            .context("failed to create GL depth-stencil renderbuffer")?;
        gpu.depth_stencil = Some(rb);
        self.gl.renderbuffer_storage(
            rb,
            gpu.sample_count,
            glow::DEPTH24_STENCIL8,
            gpu.pixel_width.max(1),
            gpu.pixel_height.max(1),
        );
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, gpu.render_framebuffer());
        self.gl
            .framebuffer_renderbuffer(glow::FRAMEBUFFER, glow::DEPTH_STENCIL_ATTACHMENT, Some(rb));
        log::debug!("gl adaptor: depth-stencil attached ({} samples)", gpu.sample_count);
        Ok(())
    }

    // GL viewports are bottom-left based. Offscreen targets are rendered with a
    // flipped projection, so only the default framebuffer needs its y flipped.
    fn gl_rect(target: &RenderTarget, gpu: &GlRenderTarget<A>, rect: PixelRect) -> [i32; 4] {
        let y = if gpu.is_default_framebuffer() {
            target.pixel_height() as i32 - (rect.y + rect.height)
        } else {
            rect.y
        };
        [rect.x, y, rect.width, rect.height]
    }

    fn set_viewport(&mut self, rect: [i32; 4]) {
        if self.viewport == Some(rect) {
            return;
        }
        let [x, y, w, h] = rect;
        self.gl.viewport(x, y, w, h);
        self.viewport = Some(rect);
    }

    fn clear_bound(&mut self, target: &RenderTarget, pass: &PassRequest, rect: [i32; 4]) {
        if pass.clear.contains(Clear::COLOR) {
            let color = pass.clear_color.to_array();
            if self.clear_color != Some(color) {
                self.gl.clear_color(color);
                self.clear_color = Some(color);
            }
        }

        // glClear ignores the viewport; scissor partial clears.
        let full = rect == [0, 0, target.pixel_width() as i32, target.pixel_height() as i32];
        if !full {
            let [x, y, w, h] = rect;
            self.gl.set_scissor(Some((x, y, w, h)));
        }
        self.gl.clear(pass.clear.bits());
        if !full {
            self.gl.set_scissor(None);
        }
    }

    // Blits every multisampled attachment into its resolve texture.
    fn resolve(&mut self, gpu: &GlRenderTarget<A>) {
        let Some(msaa) = gpu.msaa_framebuffer else { return };
        let (w, h) = (gpu.pixel_width as i32, gpu.pixel_height as i32);
        let attachments = color_attachments(gpu.color_count);

        self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(msaa));
        self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, gpu.resolve_framebuffer);
        for (i, &attachment) in attachments.iter().enumerate() {
            let mut draw = vec![glow::NONE; attachments.len()];
            draw[i] = attachment;
            self.gl.read_buffer(attachment);
            self.gl.draw_buffers(&draw);
            self.gl
                .blit_framebuffer([0, 0, w, h], [0, 0, w, h], glow::COLOR_BUFFER_BIT, glow::NEAREST);
        }
        self.gl.draw_buffers(&attachments);
    }

    // Rebinds the framebuffer the current pass draws into.
    fn restore_pass_framebuffer(&mut self) {
        let framebuffer = self.pass_framebuffer.unwrap_or(None);
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
    }

    fn bind_resolved_for_read(&mut self, gpu: &GlRenderTarget<A>) {
        self.resolve(gpu);
        self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, gpu.resolve_framebuffer);
        if !gpu.is_default_framebuffer() {
            self.gl.read_buffer(glow::COLOR_ATTACHMENT0);
        }
    }
}

fn color_attachments(count: usize) -> Vec<u32> {
    (0..count as u32).map(|i| glow::COLOR_ATTACHMENT0 + i).collect()
}

impl<A: GlApi> RenderTargetAdaptor for GlRenderTargetAdaptor<A> {
    type GpuTarget = GlRenderTarget<A>;

    fn max_sample_count(&self) -> u32 {
        self.max_samples
    }

    fn init_gpu_render_target(
        &mut self,
        target: &RenderTarget,
        options: GpuTargetOptions,
    ) -> anyhow::Result<GlRenderTarget<A>> {
        let mut gpu = GlRenderTarget::default_framebuffer(target.pixel_width(), target.pixel_height());
        if target.is_root() {
            return Ok(gpu);
        }

        gpu.color_count = target.color_textures().len();
        let built = self.build_offscreen(target, options, &mut gpu);
        self.restore_pass_framebuffer();

        if let Err(err) = built {
            self.destroy_gpu_render_target(gpu);
            return Err(err.context(format!("render target {}", target.uid())));
        }
        Ok(gpu)
    }

    fn resize_gpu_render_target(
        &mut self,
        target: &RenderTarget,
        gpu: &mut GlRenderTarget<A>,
    ) -> anyhow::Result<()> {
        gpu.pixel_width = target.pixel_width();
        gpu.pixel_height = target.pixel_height();
        if gpu.is_default_framebuffer() {
            return Ok(());
        }
        let (w, h) = (gpu.pixel_width.max(1), gpu.pixel_height.max(1));

        self.gl.bind_framebuffer(glow::FRAMEBUFFER, gpu.resolve_framebuffer);
        for (texture, attachment) in target.color_textures().iter().zip(color_attachments(gpu.color_count)) {
            let gl_texture = self.gl_texture(&texture.source())?;
            self.gl.framebuffer_texture_2d(glow::FRAMEBUFFER, attachment, Some(gl_texture));
        }
        for &rb in &gpu.msaa_renderbuffers {
            self.gl.renderbuffer_storage(rb, gpu.sample_count, glow::RGBA8, w, h);
        }
        if let Some(rb) = gpu.depth_stencil {
            self.gl.renderbuffer_storage(rb, gpu.sample_count, glow::DEPTH24_STENCIL8, w, h);
        }
        self.restore_pass_framebuffer();
        Ok(())
    }

    fn destroy_gpu_render_target(&mut self, gpu: GlRenderTarget<A>) {
        if !gpu.is_default_framebuffer() && self.pass_framebuffer == Some(gpu.render_framebuffer()) {
            self.pass_framebuffer = None;
        }
        for rb in gpu.msaa_renderbuffers {
            self.gl.delete_renderbuffer(rb);
        }
        if let Some(rb) = gpu.depth_stencil {
            self.gl.delete_renderbuffer(rb);
        }
        if let Some(fb) = gpu.msaa_framebuffer {
            self.gl.delete_framebuffer(fb);
        }
        if let Some(fb) = gpu.resolve_framebuffer {
            self.gl.delete_framebuffer(fb);
        }
    }

    fn start_render_pass(
        &mut self,
        target: &RenderTarget,
        gpu: &mut GlRenderTarget<A>,
        pass: &PassRequest,
    ) -> anyhow::Result<()> {
        if (target.depth() || target.stencil()) && !gpu.has_depth_stencil() && !gpu.is_default_framebuffer() {
            self.attach_depth_stencil(gpu)?;
        }

        self.gl.bind_framebuffer(glow::FRAMEBUFFER, gpu.render_framebuffer());
        self.pass_framebuffer = Some(gpu.render_framebuffer());
        let rect = Self::gl_rect(target, gpu, pass.viewport);
        self.set_viewport(rect);

        if !pass.clear.is_none() {
            self.clear_bound(target, pass, rect);
        }
        Ok(())
    }

    fn clear(
        &mut self,
        target: &RenderTarget,
        gpu: &mut GlRenderTarget<A>,
        pass: &PassRequest,
    ) -> anyhow::Result<()> {
        self.gl.bind_framebuffer(glow::FRAMEBUFFER, gpu.render_framebuffer());
        let rect = Self::gl_rect(target, gpu, pass.viewport);
        self.clear_bound(target, pass, rect);
        if self.pass_framebuffer != Some(gpu.render_framebuffer()) {
            self.restore_pass_framebuffer();
        }
        Ok(())
    }

    fn finish_render_pass(&mut self, _target: &RenderTarget, gpu: &mut GlRenderTarget<A>) -> anyhow::Result<()> {
        if gpu.msaa() {
            self.resolve(gpu);
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, gpu.render_framebuffer());
        }
        Ok(())
    }

    fn copy_to_texture(
        &mut self,
        source: &RenderTarget,
        gpu: &mut GlRenderTarget<A>,
        destination: &Texture,
        region: CopyRegion,
    ) -> anyhow::Result<()> {
        let dest_source = destination.source();
        let dest = self.gl_texture(&dest_source)?;

        self.bind_resolved_for_read(gpu);
        let src_y = if gpu.is_default_framebuffer() {
            source.pixel_height() as i32 - (region.src_y + region.height) as i32
        } else {
            region.src_y as i32
        };

        self.bind_unit(0, dest_source.uid(), dest);
        self.gl.copy_tex_sub_image_2d(
            region.dst_x as i32,
            region.dst_y as i32,
            region.src_x as i32,
            src_y,
            region.width as i32,
            region.height as i32,
        );
        self.restore_pass_framebuffer();
        Ok(())
    }

    fn read_pixels(
        &mut self,
        target: &RenderTarget,
        gpu: &mut GlRenderTarget<A>,
        rect: PixelRect,
    ) -> anyhow::Result<Vec<u8>> {
        if rect.is_empty() {
            return Ok(Vec::new());
        }
        let [x, y, w, h] = Self::gl_rect(target, gpu, rect);
        let row = w as usize * 4;
        let mut pixels = vec![0u8; row * h as usize];

        self.bind_resolved_for_read(gpu);
        self.gl.read_pixels_rgba8(x, y, w, h, &mut pixels);
        self.restore_pass_framebuffer();

        // Default framebuffer rows come back bottom-up.
        if gpu.is_default_framebuffer() {
            let rows: Vec<&[u8]> = pixels.chunks_exact(row).rev().collect();
            pixels = rows.concat();
        }
        Ok(pixels)
    }

    fn unbind_texture(&mut self, texture: &Texture) {
        self.forget_bindings(texture.source().uid());
    }

    fn prerender(&mut self, _root: &RenderTarget) {
        // Other GL users may have touched state between frames.
        self.viewport = None;
        self.clear_color = None;
        self.release_destroyed_textures();
    }
}
