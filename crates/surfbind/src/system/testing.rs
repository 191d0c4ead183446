//! In-memory adaptor that records every call the system makes.

use crate::coords::PixelRect;
use crate::target::{Clear, CopyRegion, RenderTarget};
use crate::texture::Texture;

use super::adaptor::{GpuTargetOptions, PassRequest, RenderTargetAdaptor};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init { target: u32, sample_count: u32 },
    Resize { target: u32, width: u32, height: u32 },
    Destroy { target: u32 },
    Start { target: u32, pass: PassRequest },
    Clear { target: u32, pass: PassRequest },
    Finish { target: u32 },
    Copy { target: u32, destination: u32, region: CopyRegion },
    ReadPixels { target: u32, rect: PixelRect },
    Unbind { texture: u32 },
    Prerender,
    Postrender,
}

/// Stand-in for a native render target.
#[derive(Debug)]
pub struct RecordedTarget {
    pub target: u32,
    pub sample_count: u32,
    pub width: u32,
    pub height: u32,
    /// Last color written by a clear; what `read_pixels` returns.
    pub fill: [u8; 4],
}

pub struct RecordingAdaptor {
    pub max_samples: u32,
    pub calls: Vec<Call>,
}

impl RecordingAdaptor {
    pub fn new(max_samples: u32) -> Self {
        Self {
            max_samples,
            calls: Vec::new(),
        }
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn starts(&self) -> Vec<PassRequest> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Start { pass, .. } => Some(*pass),
                _ => None,
            })
            .collect()
    }

    fn apply_clear(gpu: &mut RecordedTarget, pass: &PassRequest) {
        if pass.clear.contains(Clear::COLOR) {
            gpu.fill = pass.clear_color.to_rgba8();
        }
    }
}

impl RenderTargetAdaptor for RecordingAdaptor {
    type GpuTarget = RecordedTarget;

    fn max_sample_count(&self) -> u32 {
        self.max_samples
    }

    fn init_gpu_render_target(
        &mut self,
        target: &RenderTarget,
        options: GpuTargetOptions,
    ) -> anyhow::Result<RecordedTarget> {
        self.calls.push(Call::Init {
            target: target.uid(),
            sample_count: options.sample_count,
        });
        Ok(RecordedTarget {
            target: target.uid(),
            sample_count: options.sample_count,
            width: target.pixel_width(),
            height: target.pixel_height(),
            fill: [0; 4],
        })
    }

    fn resize_gpu_render_target(
        &mut self,
        target: &RenderTarget,
        gpu: &mut RecordedTarget,
    ) -> anyhow::Result<()> {
        gpu.width = target.pixel_width();
        gpu.height = target.pixel_height();
        self.calls.push(Call::Resize {
            target: target.uid(),
            width: gpu.width,
            height: gpu.height,
        });
        Ok(())
    }

    fn destroy_gpu_render_target(&mut self, gpu: RecordedTarget) {
        self.calls.push(Call::Destroy { target: gpu.target });
    }

    fn start_render_pass(
        &mut self,
        target: &RenderTarget,
        gpu: &mut RecordedTarget,
        pass: &PassRequest,
    ) -> anyhow::Result<()> {
        Self::apply_clear(gpu, pass);
        self.calls.push(Call::Start {
            target: target.uid(),
            pass: *pass,
        });
        Ok(())
    }

    fn clear(
        &mut self,
        target: &RenderTarget,
        gpu: &mut RecordedTarget,
        pass: &PassRequest,
    ) -> anyhow::Result<()> {
        Self::apply_clear(gpu, pass);
        self.calls.push(Call::Clear {
            target: target.uid(),
            pass: *pass,
        });
        Ok(())
    }

    fn finish_render_pass(&mut self, target: &RenderTarget, _gpu: &mut RecordedTarget) -> anyhow::Result<()> {
        self.calls.push(Call::Finish { target: target.uid() });
        Ok(())
    }

    fn copy_to_texture(
        &mut self,
        source: &RenderTarget,
        _gpu: &mut RecordedTarget,
        destination: &Texture,
        region: CopyRegion,
    ) -> anyhow::Result<()> {
        self.calls.push(Call::Copy {
            target: source.uid(),
            destination: destination.uid(),
            region,
        });
        Ok(())
    }

    fn read_pixels(
        &mut self,
        target: &RenderTarget,
        gpu: &mut RecordedTarget,
        rect: PixelRect,
    ) -> anyhow::Result<Vec<u8>> {
        self.calls.push(Call::ReadPixels {
            target: target.uid(),
            rect,
        });
        let n = (rect.width.max(0) * rect.height.max(0)) as usize;
        Ok(gpu.fill.repeat(n))
    }

    fn unbind_texture(&mut self, texture: &Texture) {
        self.calls.push(Call::Unbind { texture: texture.uid() });
    }

    fn prerender(&mut self, _root: &RenderTarget) {
        self.calls.push(Call::Prerender);
    }

    fn postrender(&mut self, _root: &RenderTarget) {
        self.calls.push(Call::Postrender);
    }
}
