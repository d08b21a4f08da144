use super::frame::BUFFER_COUNT;

/// Initialization parameters for the device layer.
#[derive(Debug, Clone)]
pub struct DeviceInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). FIFO is available everywhere.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Features requested on top of the ones the enabled paths need.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface. Matches the back buffer count.
    pub desired_maximum_frame_latency: u32,

    /// Render the raster pass with 4x multisampling when the format supports it.
    pub msaa_4x: bool,

    /// Request ray-query support and build acceleration structures when available.
    pub ray_tracing: bool,
}

impl Default for DeviceInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: BUFFER_COUNT as u32,
            msaa_4x: false,
            ray_tracing: false,
        }
    }
}
