use anyhow::{Context, Result};

use super::error::DeviceError;
use super::fence::{Fence, QueueTimeline};
use super::init::DeviceInit;

/// Descriptor handles in wgpu are opaque, so handles address whole slots.
pub const DESCRIPTOR_INCREMENT: u32 = 1;

/// Capabilities queried once after device creation.
#[derive(Debug, Clone)]
pub struct DeviceCaps {
    pub adapter_name: String,
    pub backend: wgpu::Backend,

    /// Required offset/size alignment of constant buffers (256 on every backend).
    pub uniform_alignment: u32,
    pub storage_alignment: u32,
    pub max_bind_groups: u32,

    /// Stride between consecutive descriptor slots, per heap kind.
    pub cbv_srv_uav_increment: u32,
    pub rtv_increment: u32,
    pub dsv_increment: u32,

    /// Ray queries were requested and granted.
    pub ray_query: bool,
}

/// Owns wgpu core objects and the frame fence.
///
/// The surface is owned separately by the swap chain; the adapter was chosen to
/// be compatible with it.
pub struct Gpu {
    /// Kept alive for the lifetime of the device.
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    fence: Fence,
    caps: DeviceCaps,
}

impl Gpu {
    /// Picks a high-performance adapter for `surface` and creates the device.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(
        instance: wgpu::Instance,
        surface: &wgpu::Surface<'_>,
        init: &DeviceInit,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(DeviceError::from)
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let ray_query = init.ray_tracing
            && adapter
                .features()
                .contains(wgpu::Features::EXPERIMENTAL_RAY_QUERY);
        if init.ray_tracing && !ray_query {
            log::warn!("ray tracing requested but not supported by {}", info.name);
        }

        let mut required_features = init.required_features;
        let mut required_limits = init.required_limits.clone();
        let mut experimental_features = wgpu::ExperimentalFeatures::disabled();
        if ray_query {
            required_features |= wgpu::Features::EXPERIMENTAL_RAY_QUERY;
            required_limits = required_limits.using_minimum_supported_acceleration_structure_values();
            // SAFETY: ray queries are gated behind experimental features; the
            // acceleration structures built here follow wgpu's documented usage.
            experimental_features = unsafe { wgpu::ExperimentalFeatures::enabled() };
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("scrith device"),
                required_features,
                required_limits,
                experimental_features,
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(DeviceError::from)
            .context("failed to create wgpu device/queue")?;

        let limits = device.limits();
        let caps = DeviceCaps {
            adapter_name: info.name,
            backend: info.backend,
            uniform_alignment: limits.min_uniform_buffer_offset_alignment,
            storage_alignment: limits.min_storage_buffer_offset_alignment,
            max_bind_groups: limits.max_bind_groups,
            cbv_srv_uav_increment: DESCRIPTOR_INCREMENT,
            rtv_increment: DESCRIPTOR_INCREMENT,
            dsv_increment: DESCRIPTOR_INCREMENT,
            ray_query,
        };
        log::debug!("device caps: {caps:?}");

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            fence: Fence::new(),
            caps,
        })
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    /// Whether `format` can be rendered with 4 samples.
    pub fn supports_msaa_4x(&self, format: wgpu::TextureFormat) -> bool {
        self.adapter
            .get_texture_format_features(format)
            .flags
            .sample_count_supported(4)
    }

    /// Blocks until all work submitted so far has completed.
    pub fn flush(&mut self) -> Result<u64, DeviceError> {
        let mut timeline = QueueTimeline::new(&self.device, &self.queue);
        self.fence.flush(&mut timeline)
    }

    /// Submits one command buffer.
    pub fn submit(&self, commands: wgpu::CommandBuffer) -> wgpu::SubmissionIndex {
        self.queue.submit(std::iter::once(commands))
    }
}
