/// Initialization parameters for the wgpu backend.
///
/// Add flags only when a concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct WgpuAdaptorConfig {
    /// Prefer an sRGB format for presentation surfaces.
    pub prefer_srgb: bool,

    /// FIFO is broadly supported and fine for UI workloads.
    pub present_mode: wgpu::PresentMode,

    /// Ignored (with a fallback) when the surface does not support it.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Upper bound on MSAA samples; further limited by what the adapter supports
    /// for the color formats in use.
    pub max_sample_count: u32,

    /// Latency hint for presentation surfaces.
    pub desired_maximum_frame_latency: u32,

    /// Favor an empty set for portability.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,
}

impl Default for WgpuAdaptorConfig {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            max_sample_count: 4,
            desired_maximum_frame_latency: 2,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}
