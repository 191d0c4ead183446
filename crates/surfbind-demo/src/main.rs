//! Opens a window and drives a `RenderTargetSystem` over wgpu: the window is the
//! root target, an antialiased offscreen texture is pushed and popped every frame
//! and a corner of it is copied into a second texture.

use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use surfbind::backend::wgpu::{WgpuAdaptorConfig, WgpuContext, WgpuRenderTargetAdaptor};
use surfbind::coords::{ColorRgba, Rect};
use surfbind::logging::{init_logging, LoggingConfig};
use surfbind::{Canvas, Clear, RenderStart, RenderTargetSystem, Texture, TextureSourceDescriptor};

struct DemoWindow {
    window: Arc<Window>,
    canvas: Canvas,
    offscreen: Texture,
    snapshot: Texture,
    system: RenderTargetSystem<WgpuRenderTargetAdaptor>,
    frame: u64,
}

impl DemoWindow {
    fn new(event_loop: &ActiveEventLoop, config: &WgpuAdaptorConfig) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("surfbind demo")
            .with_inner_size(LogicalSize::new(960.0, 540.0));
        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);

        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = WgpuContext::new_instance();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface")?;
        let ctx = pollster::block_on(WgpuContext::request(instance, config, Some(&surface)))?;

        let mut adaptor = WgpuRenderTargetAdaptor::new(ctx, config.clone());
        let canvas = Canvas::new(size.width, size.height);
        adaptor.register_surface(&canvas, surface)?;

        let offscreen = Texture::create(TextureSourceDescriptor {
            width: 256.0,
            height: 256.0,
            resolution: window.scale_factor() as f32,
            antialias: true,
            label: Some("demo offscreen".into()),
            ..Default::default()
        });
        let snapshot = Texture::create(TextureSourceDescriptor {
            width: 64.0,
            height: 64.0,
            label: Some("demo snapshot".into()),
            ..Default::default()
        });

        Ok(Self {
            window,
            canvas,
            offscreen,
            snapshot,
            system: RenderTargetSystem::new(adaptor),
            frame: 0,
        })
    }

    fn render(&mut self) -> Result<()> {
        self.frame += 1;
        let t = self.frame as f32 / 120.0;
        let background = ColorRgba::new(0.08, 0.09, 0.12, 1.0);
        let pulse = ColorRgba::new(0.5 + 0.5 * t.sin(), 0.3, 0.5 + 0.5 * t.cos(), 1.0);

        let sys = &mut self.system;
        sys.render_start(RenderStart {
            clear_color: Some(background),
            ..RenderStart::new(&self.canvas)
        })?;
        sys.adaptor().write_projection(sys.projection_matrix());

        sys.push(&self.offscreen, Clear::COLOR, Some(pulse), None)?;
        sys.adaptor().write_projection(sys.projection_matrix());
        sys.finish_render_pass()?;
        sys.pop()?;

        sys.copy_to_texture(&self.offscreen, &self.snapshot, (0, 0), (64, 64), (0, 0))?;

        // Rebind the window with a quarter-size viewport. GL scissors the clear to
        // that quarter; wgpu load ops clear the whole surface.
        let (w, h) = (self.canvas.pixel_width() as f32, self.canvas.pixel_height() as f32);
        sys.bind(&self.canvas, Clear::COLOR, Some(pulse), Some(Rect::new(0.0, 0.0, w / 2.0, h / 2.0)))?;
        sys.finish_render_pass()?;
        sys.post_render();
        Ok(())
    }
}

struct Demo {
    config: WgpuAdaptorConfig,
    window: Option<DemoWindow>,
}

impl ApplicationHandler for Demo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match DemoWindow::new(event_loop, &self.config) {
            Ok(w) => {
                w.window.request_redraw();
                self.window = Some(w);
            }
            Err(e) => {
                log::error!("failed to create demo window: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(w) = &self.window {
            w.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(demo) = self.window.as_mut() else { return };

        match event {
            WindowEvent::CloseRequested => {
                demo.system.destroy();
                demo.canvas.destroy();
                self.window = None;
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                demo.canvas.set_pixel_size(size.width, size.height);
                demo.window.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                if demo.canvas.pixel_width() == 0 || demo.canvas.pixel_height() == 0 {
                    return;
                }
                if let Err(e) = demo.render() {
                    log::warn!("frame {} skipped: {e:#}", demo.frame);
                    demo.system.reset_state();
                }
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut demo = Demo {
        config: WgpuAdaptorConfig::default(),
        window: None,
    };
    event_loop
        .run_app(&mut demo)
        .context("winit event loop terminated with error")?;
    Ok(())
}
