use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};

use crate::coords::{Matrix, PixelRect, ProjectionUniform};
use crate::system::{GpuTargetOptions, PassRequest, RenderTargetAdaptor};
use crate::target::{CopyRegion, RenderTarget};
use crate::texture::{Canvas, Texture, TextureFormat, TextureSource};

use super::config::WgpuAdaptorConfig;
use super::device::WgpuContext;
use super::plan::PassPlan;
use super::surface::{choose_alpha_mode, choose_surface_format, surface_usage};
use super::target::{Attachment, WgpuRenderTarget};

struct PresentationSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    /// Texture acquired for the current frame.
    frame: Option<wgpu::SurfaceTexture>,
}

struct TextureEntry {
    attachment: Attachment,
    source: TextureSource,
    pixel_width: u32,
    pixel_height: u32,
    update_id: u32,
}

// Everything needed to (re)open a pass on the same attachments.
#[derive(Clone)]
struct PassAttachments {
    /// Uid of the render target the attachments belong to.
    target: u32,
    colors: Vec<(wgpu::TextureView, Option<wgpu::TextureView>)>,
    depth_stencil: Option<wgpu::TextureView>,
    plan: PassPlan,
}

/// Render-target adaptor for wgpu.
///
/// Records into one command encoder per frame and keeps at most one render pass
/// open. Copies and read-backs close the open pass and reopen it afterwards
/// without clearing.
pub struct WgpuRenderTargetAdaptor {
    ctx: WgpuContext,
    config: WgpuAdaptorConfig,
    max_samples: u32,

    surfaces: HashMap<u32, PresentationSurface>,
    textures: HashMap<u32, TextureEntry>,

    encoder: Option<wgpu::CommandEncoder>,
    pass: Option<wgpu::RenderPass<'static>>,
    last_pass: Option<PassAttachments>,

    projection: wgpu::Buffer,
}

impl WgpuRenderTargetAdaptor {
    pub fn new(ctx: WgpuContext, config: WgpuAdaptorConfig) -> Self {
        let max_samples = ctx.max_sample_count(
            &[
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureFormat::Bgra8UnormSrgb,
                wgpu::TextureFormat::Depth24PlusStencil8,
            ],
            config.max_sample_count,
        );
        log::debug!("wgpu adaptor: max MSAA samples {max_samples}");

        let projection = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("surfbind projection"),
            size: std::mem::size_of::<ProjectionUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            ctx,
            config,
            max_samples,
            surfaces: HashMap::new(),
            textures: HashMap::new(),
            encoder: None,
            pass: None,
            last_pass: None,
            projection,
        }
    }

    pub fn context(&self) -> &WgpuContext {
        &self.ctx
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.ctx.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.ctx.queue
    }

    pub fn config(&self) -> &WgpuAdaptorConfig {
        &self.config
    }

    /// The open render pass, for recording draws into the bound target.
    pub fn render_pass(&mut self) -> Option<&mut wgpu::RenderPass<'static>> {
        self.pass.as_mut()
    }

    /// Uniform buffer holding the current projection (see [`Self::write_projection`]).
    pub fn projection_buffer(&self) -> &wgpu::Buffer {
        &self.projection
    }

    pub fn write_projection(&self, matrix: &Matrix) {
        let uniform = ProjectionUniform::from(matrix);
        self.ctx
            .queue
            .write_buffer(&self.projection, 0, bytemuck::bytes_of(&uniform));
    }

    // ── presentation surfaces ─────────────────────────────────────────────

    /// Makes `canvas` presentable through `surface`.
    ///
    /// Must happen before the canvas is first bound.
    pub fn register_surface(&mut self, canvas: &Canvas, surface: wgpu::Surface<'static>) -> Result<()> {
        let caps = surface.get_capabilities(&self.ctx.adapter);
        let format = choose_surface_format(&caps, self.config.prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: surface_usage(&caps),
            format,
            width: canvas.pixel_width().max(1),
            height: canvas.pixel_height().max(1),
            present_mode: self.config.present_mode,
            alpha_mode: choose_alpha_mode(&caps, self.config.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: self.config.desired_maximum_frame_latency,
        };
        surface.configure(&self.ctx.device, &config);
        log::debug!(
            "surface registered for canvas {} ({format:?}, {}x{})",
            canvas.uid(),
            config.width,
            config.height
        );

        self.surfaces.insert(
            canvas.uid(),
            PresentationSurface {
                surface,
                config,
                frame: None,
            },
        );
        Ok(())
    }

    pub fn unregister_surface(&mut self, canvas: &Canvas) {
        self.surfaces.remove(&canvas.uid());
    }

    pub fn surface_format(&self, canvas: &Canvas) -> Option<wgpu::TextureFormat> {
        self.surfaces.get(&canvas.uid()).map(|s| s.config.format)
    }

    // Acquires (once per frame) the texture to draw the canvas into.
    fn surface_texture(&mut self, canvas: u32, (width, height): (u32, u32)) -> Result<wgpu::Texture> {
        let device = &self.ctx.device;
        let s = self
            .surfaces
            .get_mut(&canvas)
            .with_context(|| format!("no presentation surface registered for canvas {canvas}"))?;

        if width > 0 && height > 0 && (s.config.width, s.config.height) != (width, height) {
            s.frame = None;
            s.config.width = width;
            s.config.height = height;
            s.surface.configure(device, &s.config);
            log::debug!("surface for canvas {canvas} reconfigured to {width}x{height}");
        }

        if s.frame.is_none() {
            let frame = match s.surface.get_current_texture() {
                Ok(frame) => frame,
                Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                    log::warn!("surface for canvas {canvas}: {err}; reconfiguring");
                    s.surface.configure(device, &s.config);
                    s.surface
                        .get_current_texture()
                        .context("failed to acquire surface texture after reconfigure")?
                }
                Err(err) => bail!("failed to acquire surface texture: {err}"),
            };
            s.frame = Some(frame);
        }

        s.frame
            .as_ref()
            .map(|f| f.texture.clone())
            .ok_or_else(|| anyhow!("surface texture missing"))
    }

    // ── texture table ─────────────────────────────────────────────────────

    /// Number of live textures backing texture sources.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Returns the wgpu texture for `source`, creating or refreshing it.
    pub fn gpu_texture(&mut self, source: &TextureSource) -> Result<wgpu::Texture> {
        Ok(self.texture_entry(source)?.attachment.texture.clone())
    }

    fn texture_entry(&mut self, source: &TextureSource) -> Result<&TextureEntry> {
        if source.is_destroyed() {
            bail!("texture source {} was destroyed", source.uid());
        }
        let uid = source.uid();
        let (pw, ph) = (source.pixel_width(), source.pixel_height());
        let update_id = source.update_id();

        let stale = self
            .textures
            .get(&uid)
            .is_none_or(|e| e.pixel_width != pw || e.pixel_height != ph);

        if stale {
            let format = source.format().to_wgpu();
            let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
                label: source.label().as_deref(),
                size: wgpu::Extent3d {
                    width: pw.max(1),
                    height: ph.max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.textures.insert(
                uid,
                TextureEntry {
                    attachment: Attachment { texture, view },
                    source: source.clone(),
                    pixel_width: pw,
                    pixel_height: ph,
                    // Forces the upload below for pixel sources.
                    update_id: update_id.wrapping_sub(1),
                },
            );
        }

        let entry = self
            .textures
            .get_mut(&uid)
            .ok_or_else(|| anyhow!("texture table lost entry {uid}"))?;
        if entry.update_id != update_id {
            entry.update_id = update_id;
            let queue = &self.ctx.queue;
            source.with_pixels(|pixels| {
                if let Some(pixels) = pixels.filter(|p| p.len() == pw as usize * ph as usize * 4) {
                    queue.write_texture(
                        wgpu::TexelCopyTextureInfo {
                            texture: &entry.attachment.texture,
                            mip_level: 0,
                            origin: wgpu::Origin3d::ZERO,
                            aspect: wgpu::TextureAspect::All,
                        },
                        pixels,
                        wgpu::TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(pw * 4),
                            rows_per_image: Some(ph),
                        },
                        wgpu::Extent3d {
                            width: pw,
                            height: ph,
                            depth_or_array_layers: 1,
                        },
                    );
                }
            });
        }
        Ok(entry)
    }

    /// Drops textures whose sources were destroyed. Returns how many were released.
    pub fn release_destroyed_textures(&mut self) -> usize {
        let before = self.textures.len();
        self.textures.retain(|_, e| !e.source.is_destroyed());
        let released = before - self.textures.len();
        if released > 0 {
            log::debug!("wgpu adaptor: released {released} texture(s) of destroyed sources");
        }
        released
    }

    // ── encoder / passes ──────────────────────────────────────────────────

    fn end_pass(&mut self) {
        // Dropping the pass ends it; multisampled attachments resolve here.
        self.pass = None;
    }

    fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        let device = &self.ctx.device;
        self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("surfbind encoder"),
            })
        })
    }

    fn begin_pass(&mut self, attachments: PassAttachments) {
        self.end_pass();

        let plan = attachments.plan;
        let colors: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = attachments
            .colors
            .iter()
            .map(|(view, resolve)| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: resolve.as_ref(),
                    ops: plan.color_ops(),
                    depth_slice: None,
                })
            })
            .collect();
        let depth_stencil = attachments
            .depth_stencil
            .as_ref()
            .map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: plan.depth_ops(),
                stencil_ops: plan.stencil_ops(),
            });

        let mut pass = self
            .encoder()
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("surfbind pass"),
                color_attachments: &colors,
                depth_stencil_attachment: depth_stencil,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();

        if let Some([x, y, w, h]) = plan.viewport {
            pass.set_viewport(x, y, w, h, 0.0, 1.0);
        }
        drop(colors);

        self.pass = Some(pass);
        self.last_pass = Some(attachments);
    }

    // Reopens the last pass after a copy, keeping its contents.
    fn restore_pass(&mut self) {
        if let Some(mut attachments) = self.last_pass.take() {
            attachments.plan = attachments.plan.reload();
            self.begin_pass(attachments);
        }
    }

    fn pass_attachments(
        &mut self,
        target: &RenderTarget,
        gpu: &WgpuRenderTarget,
        plan: PassPlan,
    ) -> Result<PassAttachments> {
        let resolved: Vec<wgpu::TextureView> = match gpu.canvas {
            Some(canvas) => {
                let texture = self.surface_texture(canvas, (target.pixel_width(), target.pixel_height()))?;
                vec![texture.create_view(&wgpu::TextureViewDescriptor::default())]
            }
            None => target
                .color_textures()
                .iter()
                .map(|t| Ok(self.texture_entry(&t.source())?.attachment.view.clone()))
                .collect::<Result<_>>()?,
        };

        let colors = if gpu.msaa() {
            gpu.msaa
                .iter()
                .zip(resolved)
                .map(|(msaa, resolve)| (msaa.view.clone(), Some(resolve)))
                .collect()
        } else {
            resolved.into_iter().map(|view| (view, None)).collect()
        };

        Ok(PassAttachments {
            target: target.uid(),
            colors,
            depth_stencil: gpu.depth_stencil.as_ref().map(|a| a.view.clone()),
            plan,
        })
    }

    // Resolved color[0] storage, for copies and read-back.
    // Records a texture-to-texture copy from the (resolved) color of `source`.
    fn encode_copy(
        &mut self,
        source: &RenderTarget,
        gpu: &mut WgpuRenderTarget,
        destination: &Texture,
        region: CopyRegion,
    ) -> Result<()> {
        let src = self.resolved_texture(source, gpu)?;
        let dst = self.gpu_texture(&destination.source())?;
        self.encoder().copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &src,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.src_x,
                    y: region.src_y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &dst,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.dst_x,
                    y: region.dst_y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );

        Ok(())
    }

    fn resolved_texture(&mut self, target: &RenderTarget, gpu: &WgpuRenderTarget) -> Result<wgpu::Texture> {
        match gpu.canvas {
            Some(canvas) => self.surface_texture(canvas, (target.pixel_width(), target.pixel_height())),
            None => self.gpu_texture(&target.color_texture().source()),
        }
    }

    /// Submits everything recorded so far.
    pub fn submit(&mut self) {
        self.end_pass();
        self.last_pass = None;
        if let Some(encoder) = self.encoder.take() {
            self.ctx.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    /// Submits and presents every surface drawn to this frame.
    pub fn present(&mut self) {
        self.submit();
        for s in self.surfaces.values_mut() {
            if let Some(frame) = s.frame.take() {
                frame.present();
            }
        }
    }

    fn ensure_depth_stencil(&mut self, target: &RenderTarget, gpu: &mut WgpuRenderTarget) {
        if (target.depth() || target.stencil()) && !gpu.has_depth_stencil() {
            gpu.depth_stencil = Some(Attachment::new(
                &self.ctx.device,
                "surfbind depth-stencil",
                wgpu::TextureFormat::Depth24PlusStencil8,
                gpu.sample_count,
                gpu.pixel_size(),
            ));
            log::debug!("wgpu adaptor: depth-stencil attached to render target {}", target.uid());
        }
    }
}

impl RenderTargetAdaptor for WgpuRenderTargetAdaptor {
    type GpuTarget = WgpuRenderTarget;

    fn max_sample_count(&self) -> u32 {
        self.max_samples
    }

    fn init_gpu_render_target(
        &mut self,
        target: &RenderTarget,
        options: GpuTargetOptions,
    ) -> Result<WgpuRenderTarget> {
        let canvas = target.color_texture().source().canvas().map(|c| c.uid());
        let formats = match canvas {
            Some(uid) => {
                let s = self
                    .surfaces
                    .get(&uid)
                    .with_context(|| format!("no presentation surface registered for canvas {uid}"))?;
                vec![s.config.format]
            }
            None => target
                .color_textures()
                .iter()
                .map(|t| t.source().format().to_wgpu())
                .collect(),
        };

        let mut gpu = WgpuRenderTarget {
            canvas,
            sample_count: options.sample_count,
            formats,
            msaa: Vec::new(),
            depth_stencil: None,
            pixel_width: target.pixel_width(),
            pixel_height: target.pixel_height(),
        };
        gpu.allocate(&self.ctx.device, target.depth() || target.stencil());
        Ok(gpu)
    }

    fn resize_gpu_render_target(&mut self, target: &RenderTarget, gpu: &mut WgpuRenderTarget) -> Result<()> {
        gpu.pixel_width = target.pixel_width();
        gpu.pixel_height = target.pixel_height();
        let depth_stencil = gpu.has_depth_stencil();
        gpu.release();
        gpu.allocate(&self.ctx.device, depth_stencil);
        Ok(())
    }

    fn destroy_gpu_render_target(&mut self, mut gpu: WgpuRenderTarget) {
        gpu.release();
    }

    fn start_render_pass(
        &mut self,
        target: &RenderTarget,
        gpu: &mut WgpuRenderTarget,
        pass: &PassRequest,
    ) -> Result<()> {
        if gpu.is_screen() {
            gpu.pixel_width = target.pixel_width();
            gpu.pixel_height = target.pixel_height();
            if gpu.msaa.first().is_some_and(|a| {
                let size = a.texture.size();
                (size.width, size.height) != (gpu.pixel_width.max(1), gpu.pixel_height.max(1))
            }) {
                let depth_stencil = gpu.has_depth_stencil();
                gpu.release();
                gpu.allocate(&self.ctx.device, depth_stencil);
            }
        }
        self.ensure_depth_stencil(target, gpu);

        let plan = PassPlan::new(pass, gpu.has_depth_stencil(), gpu.pixel_size());
        let attachments = self.pass_attachments(target, gpu, plan)?;
        self.begin_pass(attachments);
        Ok(())
    }

    // Load ops are the only way to clear, so a clear opens a fresh pass. Another
    // target gets a pass of its own, after which the current one is reopened.
    fn clear(&mut self, target: &RenderTarget, gpu: &mut WgpuRenderTarget, pass: &PassRequest) -> Result<()> {
        let current = self.last_pass.as_ref().map(|p| p.target);
        if current.is_none_or(|uid| uid == target.uid()) {
            return self.start_render_pass(target, gpu, pass);
        }

        let reopen = self.pass.is_some();
        let last_pass = self.last_pass.take();
        let cleared = self.start_render_pass(target, gpu, pass);
        self.end_pass();

        self.last_pass = last_pass;
        if reopen {
            self.restore_pass();
        }
        cleared
    }

    fn finish_render_pass(&mut self, _target: &RenderTarget, _gpu: &mut WgpuRenderTarget) -> Result<()> {
        self.end_pass();
        Ok(())
    }

    fn copy_to_texture(
        &mut self,
        source: &RenderTarget,
        gpu: &mut WgpuRenderTarget,
        destination: &Texture,
        region: CopyRegion,
    ) -> Result<()> {
        let reopen = self.pass.is_some();
        self.end_pass();

        let copied = self.encode_copy(source, gpu, destination, region);
        if reopen {
            self.restore_pass();
        }
        copied
    }

    fn read_pixels(&mut self, target: &RenderTarget, gpu: &mut WgpuRenderTarget, rect: PixelRect) -> Result<Vec<u8>> {
        let Some(region) = crate::target::clamp_copy_region(
            (rect.x, rect.y),
            (rect.width, rect.height),
            (0, 0),
            (target.pixel_width(), target.pixel_height()),
        ) else {
            return Ok(Vec::new());
        };

        let reopen = self.pass.is_some();
        self.end_pass();

        let texture = self.resolved_texture(target, gpu)?;
        let bgra = TextureFormat::from_wgpu(texture.format())
            .is_some_and(TextureFormat::is_bgra);

        let row_bytes = region.width * 4;
        let padded_row_bytes = align_to(row_bytes, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("surfbind readback"),
            size: padded_row_bytes as u64 * region.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        self.encoder().copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.src_x,
                    y: region.src_y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(region.height),
                },
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );

        let last_pass = self.last_pass.take();
        self.submit();

        let slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.ctx
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| anyhow!("wgpu poll failed: {e:?}"))?;
        rx.recv()
            .context("readback channel closed")?
            .map_err(|e| anyhow!("readback map failed: {e:?}"))?;

        let mut out = Vec::with_capacity(row_bytes as usize * region.height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded_row_bytes as usize) {
                out.extend_from_slice(&row[..row_bytes as usize]);
            }
        }
        readback.unmap();

        if bgra {
            for px in out.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }

        self.last_pass = last_pass;
        if reopen {
            self.restore_pass();
        }
        Ok(out)
    }

    fn prerender(&mut self, _root: &RenderTarget) {
        self.release_destroyed_textures();
    }

    fn postrender(&mut self, _root: &RenderTarget) {
        self.present();
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ColorRgba;
    use crate::system::RenderTargetSystem;
    use crate::target::Clear;
    use crate::texture::TextureSourceDescriptor;

    #[test]
    fn rows_align_to_copy_alignment() {
        assert_eq!(align_to(4, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(1028, 256), 1280);
    }

    fn headless_system() -> RenderTargetSystem<WgpuRenderTargetAdaptor> {
        let config = WgpuAdaptorConfig::default();
        let ctx = WgpuContext::headless(&config).expect("gpu adapter");
        RenderTargetSystem::new(WgpuRenderTargetAdaptor::new(ctx, config))
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn msaa_red_clear_reads_back_red() {
        let mut sys = headless_system();
        let tex = Texture::create(TextureSourceDescriptor {
            width: 8.0,
            height: 8.0,
            antialias: true,
            ..Default::default()
        });

        let h = sys
            .bind(&tex, Clear::COLOR, Some(ColorRgba::new(1.0, 0.0, 0.0, 1.0)), None)
            .unwrap();
        assert!(sys.get_gpu_render_target(h).unwrap().msaa() || sys.adaptor().max_sample_count() == 1);
        sys.finish_render_pass().unwrap();

        let pixels = sys.read_pixels(&tex, PixelRect::new(2, 2, 3, 3)).unwrap();
        assert_eq!(pixels.len(), 36);
        assert!(pixels.chunks(4).all(|p| p == [255, 0, 0, 255]));
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn copy_moves_cleared_pixels() {
        let mut sys = headless_system();
        let src = Texture::create(TextureSourceDescriptor {
            width: 4.0,
            height: 4.0,
            ..Default::default()
        });
        let dst = Texture::create(TextureSourceDescriptor {
            width: 4.0,
            height: 4.0,
            ..Default::default()
        });

        sys.bind(&dst, Clear::COLOR, Some(ColorRgba::black()), None).unwrap();
        sys.bind(&src, Clear::COLOR, Some(ColorRgba::new(0.0, 1.0, 0.0, 1.0)), None)
            .unwrap();
        sys.finish_render_pass().unwrap();
        sys.copy_to_texture(&src, &dst, (-2, 0), (4, 4), (0, 0)).unwrap();

        let pixels = sys.read_pixels(&dst, PixelRect::from_size(4, 1)).unwrap();
        assert_eq!(&pixels[0..8], &[0, 0, 0, 255, 0, 0, 0, 255]);
        assert_eq!(&pixels[8..16], &[0, 255, 0, 255, 0, 255, 0, 255]);
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn clearing_another_target_keeps_the_bound_pass() {
        let mut sys = headless_system();
        let desc = || TextureSourceDescriptor {
            width: 2.0,
            height: 2.0,
            ..Default::default()
        };
        let a = Texture::create(desc());
        let b = Texture::create(desc());
        let blue = ColorRgba::new(0.0, 0.0, 1.0, 1.0);
        let red = ColorRgba::new(1.0, 0.0, 0.0, 1.0);

        sys.bind(&b, Clear::COLOR, Some(ColorRgba::black()), None).unwrap();
        sys.bind(&a, Clear::COLOR, Some(blue), None).unwrap();
        sys.clear(Some((&b).into()), Clear::COLOR, Some(red)).unwrap();
        assert!(sys.adaptor_mut().render_pass().is_some());
        sys.finish_render_pass().unwrap();

        let a_pixels = sys.read_pixels(&a, PixelRect::from_size(2, 2)).unwrap();
        let b_pixels = sys.read_pixels(&b, PixelRect::from_size(2, 2)).unwrap();
        assert!(a_pixels.chunks(4).all(|p| p == [0, 0, 255, 255]));
        assert!(b_pixels.chunks(4).all(|p| p == [255, 0, 0, 255]));
    }
}
