use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::error::{DeviceError, SurfaceErrorAction};
use super::frame::{BUFFER_COUNT, FrameContext};
use super::gpu::Gpu;
use super::init::DeviceInit;
use super::state::{ResourceId, ResourceState, StateTracker, Transition};
use crate::descriptor::{DescriptorHandle, DescriptorHeap, HeapKind};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Depth-stencil target sized to the client area.
pub struct DepthBuffer {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Multisampled color target resolved into the back buffer.
pub struct MsaaTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// Back buffer acquired for the current frame.
///
/// Short-lived: holding the surface texture blocks acquisition of the next one.
pub struct AcquiredFrame {
    pub index: usize,
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

/// Double-buffered swap chain with its depth buffer.
pub struct SwapChain {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    sample_count: u32,
    copy_src: bool,

    rtv_heap: DescriptorHeap,
    dsv_heap: DescriptorHeap,
    rtv_handles: [Option<DescriptorHandle>; BUFFER_COUNT],

    depth: Option<DepthBuffer>,
    msaa: Option<MsaaTarget>,
    frame: FrameContext,
}

impl SwapChain {
    /// Creates the surface for `window`. Configuration is done by [`SwapChain::configure`].
    pub fn create_surface(
        instance: &wgpu::Instance,
        window: Arc<Window>,
    ) -> Result<wgpu::Surface<'static>> {
        instance
            .create_surface(window)
            .map_err(DeviceError::from)
            .context("failed to create wgpu surface")
    }

    pub fn new(
        gpu: &Gpu,
        window: Arc<Window>,
        surface: wgpu::Surface<'static>,
        init: &DeviceInit,
    ) -> Result<Self> {
        let size = window.inner_size();
        let caps = surface.get_capabilities(gpu.adapter());

        let format = choose_surface_format(&caps, init.prefer_srgb)
            .ok_or(DeviceError::NoSurfaceFormat)
            .context("surface has no usable format")?;
        let alpha_mode = choose_alpha_mode(&caps, init.alpha_mode);

        // Copying the back buffer into the post-process source needs COPY_SRC.
        let copy_src = caps.usages.contains(wgpu::TextureUsages::COPY_SRC);
        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        if copy_src {
            usage |= wgpu::TextureUsages::COPY_SRC;
        } else {
            log::warn!("surface does not allow COPY_SRC");
        }

        let sample_count = if init.msaa_4x && gpu.supports_msaa_4x(format) {
            4
        } else {
            if init.msaa_4x {
                log::warn!("4x MSAA not supported for {format:?}");
            }
            1
        };

        let config = wgpu::SurfaceConfiguration {
            usage,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: init.present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        let caps = gpu.caps();
        log::info!(
            "swap chain: {format:?}, {BUFFER_COUNT} buffers, {sample_count}x samples, {}x{}",
            size.width,
            size.height
        );

        Ok(Self {
            window,
            surface,
            config,
            size,
            sample_count,
            copy_src,
            rtv_heap: DescriptorHeap::new(HeapKind::Rtv, BUFFER_COUNT as u32, caps.rtv_increment, false),
            dsv_heap: DescriptorHeap::new(HeapKind::Dsv, 1, caps.dsv_increment, false),
            rtv_handles: [None; BUFFER_COUNT],
            depth: None,
            msaa: None,
            frame: FrameContext::new(size.width, size.height),
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Returns the active surface format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn is_drawable(&self) -> bool {
        self.size.width > 0 && self.size.height > 0 && self.depth.is_some()
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Whether the back buffer can be copied from.
    pub fn supports_copy_src(&self) -> bool {
        self.copy_src
    }

    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut FrameContext {
        &mut self.frame
    }

    pub fn depth(&self) -> Option<&DepthBuffer> {
        self.depth.as_ref()
    }

    pub fn msaa(&self) -> Option<&MsaaTarget> {
        self.msaa.as_ref()
    }

    pub fn rtv_handle(&self, index: usize) -> Option<DescriptorHandle> {
        self.rtv_handles.get(index).copied().flatten()
    }

    pub fn dsv_handle(&self) -> Option<DescriptorHandle> {
        self.depth.as_ref().and_then(|_| self.dsv_heap.handle(0).ok())
    }

    /// Rebuilds every size-dependent object for `new_size`.
    ///
    /// Waits for the GPU first. A zero-sized client area only records the size;
    /// configuration is deferred until the window has a drawable area again.
    pub fn resize(
        &mut self,
        gpu: &mut Gpu,
        tracker: &mut StateTracker,
        new_size: PhysicalSize<u32>,
    ) -> Result<()> {
        let watermark = gpu.flush().context("flush before resize failed")?;
        self.frame.record_fence(watermark);

        // Release everything that references the old buffers.
        self.depth = None;
        self.msaa = None;
        self.rtv_handles = [None; BUFFER_COUNT];
        for i in 0..BUFFER_COUNT {
            tracker.forget(ResourceId::BackBuffer(i));
        }
        tracker.forget(ResourceId::DepthStencil);

        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            log::debug!("resize to zero area deferred");
            return Ok(());
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(gpu.device(), &self.config);
        self.frame.set_client_size(new_size.width, new_size.height);

        for (i, slot) in self.rtv_handles.iter_mut().enumerate() {
            *slot = Some(self.rtv_heap.handle(i as u32)?);
            tracker.register(ResourceId::BackBuffer(i), ResourceState::Present);
        }

        if self.sample_count > 1 {
            self.msaa = Some(create_msaa_target(gpu.device(), &self.config, self.sample_count));
        }

        let depth = create_depth_buffer(gpu.device(), new_size, self.sample_count);
        tracker.register(ResourceId::DepthStencil, ResourceState::Common);
        self.transition_depth(gpu, tracker, &depth)?;
        self.depth = Some(depth);

        log::debug!("swap chain resized to {}x{}", new_size.width, new_size.height);
        Ok(())
    }

    /// Moves a fresh depth buffer into its writable state with its own
    /// submission (a clear to 1.0 / stencil 0), then waits for it.
    fn transition_depth(
        &mut self,
        gpu: &mut Gpu,
        tracker: &mut StateTracker,
        depth: &DepthBuffer,
    ) -> Result<()> {
        let mut encoder = gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scrith depth init"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scrith depth clear"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        tracker.transition(Transition::new(
            ResourceId::DepthStencil,
            ResourceState::Common,
            ResourceState::DepthWrite,
        ))?;
        gpu.submit(encoder.finish());

        let watermark = gpu.flush().context("flush after depth init failed")?;
        self.frame.record_fence(watermark);
        Ok(())
    }

    /// Acquires the back buffer for this frame.
    pub fn acquire(&self) -> Result<AcquiredFrame, wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Ok(AcquiredFrame {
            index: self.frame.back_buffer_index(),
            surface_texture,
            view,
        })
    }

    /// Presents `frame` and rotates to the next back buffer.
    pub fn present(&mut self, frame: AcquiredFrame) -> usize {
        self.window.pre_present_notify();
        drop(frame.view);
        frame.surface_texture.present();
        self.frame.advance()
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, gpu: &Gpu, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        map_surface_error(&self.surface, gpu.device(), &self.config, self.size, err)
    }
}

fn create_depth_buffer(device: &wgpu::Device, size: PhysicalSize<u32>, samples: u32) -> DepthBuffer {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scrith depth stencil"),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: samples,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    DepthBuffer { texture, view }
}

fn create_msaa_target(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    samples: u32,
) -> MsaaTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scrith msaa color"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: samples,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    MsaaTarget { texture, view }
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    if caps.formats.is_empty() {
        return None;
    }

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| caps.formats.contains(f)) {
            return Some(f);
        }
    }

    caps.formats.first().copied()
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if size.width > 0 && size.height > 0 {
                surface.configure(device, config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: Vec<wgpu::TextureFormat>, alpha: Vec<wgpu::CompositeAlphaMode>) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats,
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes: alpha,
            usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    #[test]
    fn prefers_srgb_when_available() {
        let c = caps(
            vec![wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Bgra8UnormSrgb],
            vec![],
        );
        assert_eq!(choose_surface_format(&c, true), Some(wgpu::TextureFormat::Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&c, false), Some(wgpu::TextureFormat::Bgra8Unorm));
    }

    #[test]
    fn no_formats_yields_none() {
        assert_eq!(choose_surface_format(&caps(vec![], vec![]), true), None);
    }

    #[test]
    fn unsupported_alpha_mode_falls_back() {
        let c = caps(vec![], vec![wgpu::CompositeAlphaMode::Opaque]);
        assert_eq!(
            choose_alpha_mode(&c, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
        assert_eq!(
            choose_alpha_mode(&caps(vec![], vec![]), None),
            wgpu::CompositeAlphaMode::Auto
        );
    }
}
