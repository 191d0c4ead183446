use anyhow::{Context, Result};

use super::config::WgpuAdaptorConfig;

/// wgpu core objects shared by every render target.
pub struct WgpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl WgpuContext {
    pub fn new_instance() -> wgpu::Instance {
        // All backends; wgpu picks the best one for the platform.
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    /// Acquires an adapter and device from `instance`.
    ///
    /// Pass the window surface when there is one so the adapter can present to it.
    pub async fn request(
        instance: wgpu::Instance,
        config: &WgpuAdaptorConfig,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("wgpu adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("surfbind device"),
                required_features: config.required_features,
                required_limits: config.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Blocking headless setup, for offscreen rendering and tests.
    pub fn headless(config: &WgpuAdaptorConfig) -> Result<Self> {
        pollster::block_on(Self::request(Self::new_instance(), config, None))
    }

    /// Highest sample count usable with every format in `formats`, capped at `cap`.
    pub fn max_sample_count(&self, formats: &[wgpu::TextureFormat], cap: u32) -> u32 {
        [16, 8, 4, 2]
            .into_iter()
            .filter(|&n| n <= cap)
            .find(|&n| {
                formats.iter().all(|&f| {
                    self.adapter
                        .get_texture_format_features(f)
                        .flags
                        .sample_count_supported(n)
                })
            })
            .unwrap_or(1)
    }
}
