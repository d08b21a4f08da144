use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use scrith_engine::config::DemoConfig;
use scrith_engine::core::Signal;
use scrith_engine::device::GraphicsContext;
use scrith_engine::render::{FrameOutcome, Mesh, Renderer};
use scrith_engine::scene::{CameraInput, FlyCamera};
use scrith_engine::time::{FrameClock, GameTime};
use scrith_engine::window::WindowShim;

/// State shared by every demo task.
///
/// Starts empty; Init fills the optional parts and Destroy empties them again.
/// Field order is drop order: renderer, graphics context, then the window.
pub struct TechDemo {
    config: DemoConfig,

    renderer: Option<Renderer>,
    gx: Option<GraphicsContext>,
    shim: Option<WindowShim>,

    camera: FlyCamera,
    clock: FrameClock,
    time: GameTime,
    pending_resize: Option<PhysicalSize<u32>>,

    presented: u64,
    skipped: u64,
    title_second: u32,
}

impl TechDemo {
    pub fn new(config: DemoConfig) -> Self {
        Self {
            config,
            renderer: None,
            gx: None,
            shim: None,
            camera: FlyCamera::default(),
            clock: FrameClock::new(),
            time: GameTime::default(),
            pending_resize: None,
            presented: 0,
            skipped: 0,
            title_second: 0,
        }
    }

    fn shim(&mut self) -> Result<&mut WindowShim> {
        self.shim.as_mut().context("window is not open")
    }

    // ── platform ─────────────────────────────────────────────────────────

    pub fn os_init(&mut self) -> Result<()> {
        let shim = WindowShim::open(self.config.window.clone()).context("window creation failed")?;
        self.shim = Some(shim);
        Ok(())
    }

    pub fn os_update(&mut self) -> Signal {
        match self.shim.as_mut() {
            Some(shim) => shim.pump(),
            None => Signal::Quit,
        }
    }

    pub fn os_frame(&mut self) -> Result<Signal> {
        let shim = self.shim()?;
        if shim.quit_requested() {
            return Ok(Signal::Quit);
        }
        if let Some(size) = shim.take_resize() {
            self.pending_resize = Some(size);
        }
        Ok(Signal::Forward)
    }

    pub fn os_pre_release(&mut self) -> Result<()> {
        if let Some(shim) = &self.shim {
            shim.hide();
        }
        Ok(())
    }

    pub fn os_release(&mut self) -> Result<()> {
        if let Some(mut shim) = self.shim.take() {
            shim.close();
        }
        Ok(())
    }

    // ── graphics ─────────────────────────────────────────────────────────

    pub fn gx_init(&mut self) -> Result<()> {
        let window = self
            .shim()?
            .window()
            .context("window shim has no window")?
            .clone();

        let mut gx = GraphicsContext::new_blocking(window, &self.config.device)?;
        let renderer = Renderer::new(&mut gx, &self.config)?;

        self.renderer = Some(renderer);
        self.gx = Some(gx);
        Ok(())
    }

    pub fn render(&mut self) -> Result<()> {
        let gx = self.gx.as_mut().context("graphics context missing")?;
        let renderer = self.renderer.as_mut().context("renderer missing")?;
        let shim = self.shim.as_ref().context("window is not open")?;

        if let Some(size) = self.pending_resize.take() {
            log::debug!("client resized to {}x{}", size.width, size.height);
            renderer.handle_resize(gx, size)?;
        }

        renderer.update(gx, &self.camera, &self.time, shim.input().mouse_vector());
        match renderer.frame(gx)? {
            FrameOutcome::Presented { next_back_buffer, fence } => {
                self.presented = gx.swap_chain.frame().frames_presented();
                log::trace!("presented; next back buffer {next_back_buffer}, fence {fence}");
            }
            FrameOutcome::Skipped => self.skipped += 1,
        }
        Ok(())
    }

    pub fn gx_release(&mut self) -> Result<()> {
        // Renderer objects must go before the device that created them.
        drop(self.renderer.take());
        if self.gx.take().is_some() {
            log::info!("graphics released");
        }
        Ok(())
    }

    // ── application ──────────────────────────────────────────────────────

    pub fn on_init(&mut self) -> Result<()> {
        self.camera = FlyCamera::default();
        self.clock.reset();
        self.time = GameTime::default();

        if let Some(renderer) = &self.renderer {
            log::info!(
                "{} tiles of {} vertices, {:?}",
                renderer.mesh().instance_count(),
                renderer.mesh().vertices_per_instance(),
                renderer.frame_kind()
            );
        }
        Ok(())
    }

    pub fn on_update(&mut self) -> Result<()> {
        self.time = self.clock.tick();
        let shim = self.shim()?;
        let input = CameraInput::from_keys(shim.input(), shim.input_frame());
        self.camera.update(self.time.delta, input);
        Ok(())
    }

    pub fn on_post_render(&mut self) -> Result<()> {
        let second = self.time.total as u32;
        if second == self.title_second {
            return Ok(());
        }
        self.title_second = second;

        let title = format!("{} - {:.0} fps", self.config.window.title, self.time.fps);
        if let Some(window) = self.shim()?.window() {
            window.set_title(&title);
        }
        Ok(())
    }

    pub fn on_release(&mut self) -> Result<()> {
        log::info!(
            "{} frames presented, {} skipped, {:.1} s, {:.1} fps average",
            self.presented,
            self.skipped,
            self.time.total,
            self.time.fps_total
        );
        Ok(())
    }
}
