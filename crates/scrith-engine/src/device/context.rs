use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::gpu::Gpu;
use super::init::DeviceInit;
use super::state::StateTracker;
use super::surface::SwapChain;

/// Everything GPU-owning that the frame needs, in one owned value.
///
/// Field order is drop order: the swap chain (and with it the surface) goes
/// before the device.
pub struct GraphicsContext {
    pub swap_chain: SwapChain,
    pub tracker: StateTracker,
    pub gpu: Gpu,
}

impl GraphicsContext {
    /// Creates instance, surface, device and swap chain for `window`, then
    /// performs the initial resize.
    pub async fn new(window: Arc<Window>, init: &DeviceInit) -> Result<Self> {
        // Use all backends to allow wgpu to select the optimal platform backend.
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = SwapChain::create_surface(&instance, Arc::clone(&window))?;
        let mut gpu = Gpu::new(instance, &surface, init).await?;
        let mut swap_chain = SwapChain::new(&gpu, Arc::clone(&window), surface, init)?;
        let mut tracker = StateTracker::new();

        swap_chain
            .resize(&mut gpu, &mut tracker, window.inner_size())
            .context("initial swap chain setup failed")?;

        Ok(Self {
            swap_chain,
            tracker,
            gpu,
        })
    }

    /// Blocking variant of [`GraphicsContext::new`].
    pub fn new_blocking(window: Arc<Window>, init: &DeviceInit) -> Result<Self> {
        pollster::block_on(Self::new(window, init))
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        self.swap_chain.resize(&mut self.gpu, &mut self.tracker, size)
    }

    /// Waits for the GPU and records the fence value in the frame context.
    pub fn flush(&mut self) -> Result<u64> {
        let value = self.gpu.flush().context("fence flush failed")?;
        self.swap_chain.frame_mut().record_fence(value);
        Ok(value)
    }
}

impl Drop for GraphicsContext {
    fn drop(&mut self) {
        // GPU objects must not be released while still referenced by queued work.
        if let Err(e) = self.gpu.flush() {
            log::warn!("flush on release failed: {e}");
        }
        log::debug!("graphics context released");
    }
}
