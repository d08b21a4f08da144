use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use crate::config::WindowConfig;
use crate::core::Signal;
use crate::input::platform::translate_window_event;
use crate::input::{InputFrame, InputState};

/// Pumps allowed for the platform to deliver `resumed` during `open`.
const OPEN_PUMP_ATTEMPTS: u32 = 64;

/// Owns the event loop and the single demo window.
///
/// The loop is never handed control: [`WindowShim::pump`] drains pending events
/// without blocking and reports what the scheduler should do next.
pub struct WindowShim {
    event_loop: EventLoop<()>,
    handler: ShimHandler,
}

struct ShimHandler {
    config: WindowConfig,
    window: Option<Arc<Window>>,
    create_error: Option<anyhow::Error>,

    client_size: PhysicalSize<u32>,
    pending_resize: Option<PhysicalSize<u32>>,

    input_state: InputState,
    input_frame: InputFrame,

    quit: bool,
    /// A non-motion event was handled during the current pump.
    busy: bool,
}

impl WindowShim {
    /// Creates the event loop and the window, pumping until the platform has
    /// delivered it.
    pub fn open(config: WindowConfig) -> Result<Self> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut shim = Self {
            event_loop,
            handler: ShimHandler::new(config),
        };

        for _ in 0..OPEN_PUMP_ATTEMPTS {
            let status = shim
                .event_loop
                .pump_app_events(Some(Duration::ZERO), &mut shim.handler);

            if let Some(e) = shim.handler.create_error.take() {
                return Err(e);
            }
            if shim.handler.window.is_some() {
                break;
            }
            if let PumpStatus::Exit(code) = status {
                return Err(anyhow!("event loop exited with code {code} before the window opened"));
            }
        }

        let window = shim
            .handler
            .window
            .as_ref()
            .ok_or_else(|| anyhow!("platform never resumed the application"))?;
        shim.handler.client_size = window.inner_size();
        shim.handler.pending_resize = None;

        log::info!(
            "window opened: {}x{}",
            shim.handler.client_size.width,
            shim.handler.client_size.height
        );
        Ok(shim)
    }

    /// Drains pending platform events with a zero timeout.
    ///
    /// Quit on close request, Escape or loop exit; Pause when any non-motion
    /// event was handled; Forward otherwise.
    pub fn pump(&mut self) -> Signal {
        self.handler.input_frame.clear();
        self.handler.busy = false;

        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler);

        if matches!(status, PumpStatus::Exit(_)) || self.handler.quit {
            Signal::Quit
        } else if self.handler.busy {
            Signal::Pause
        } else {
            Signal::Forward
        }
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.handler.window.as_ref()
    }

    /// Client area in physical pixels.
    pub fn client_size(&self) -> PhysicalSize<u32> {
        self.handler.client_size
    }

    /// Returns the latest client size if it changed since the last call.
    pub fn take_resize(&mut self) -> Option<PhysicalSize<u32>> {
        self.handler.pending_resize.take()
    }

    pub fn input(&self) -> &InputState {
        &self.handler.input_state
    }

    /// Input transitions delivered by the most recent pump.
    pub fn input_frame(&self) -> &InputFrame {
        &self.handler.input_frame
    }

    pub fn quit_requested(&self) -> bool {
        self.handler.quit
    }

    /// Hides the window ahead of GPU teardown.
    pub fn hide(&self) {
        if let Some(w) = &self.handler.window {
            w.set_visible(false);
        }
    }

    /// Drops the window. The event loop goes with `self`.
    pub fn close(&mut self) {
        if self.handler.window.take().is_some() {
            log::info!("window closed");
        }
    }
}

impl ShimHandler {
    fn new(config: WindowConfig) -> Self {
        Self {
            config,
            window: None,
            create_error: None,
            client_size: PhysicalSize::new(0, 0),
            pending_resize: None,
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            quit: false,
            busy: false,
        }
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        Ok(Arc::new(window))
    }
}

impl ApplicationHandler for ShimHandler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match self.create_window(event_loop) {
            Ok(w) => self.window = Some(w),
            Err(e) => self.create_error = Some(e),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(ev) = translate_window_event(&event) {
            self.input_state.apply_event(&mut self.input_frame, ev);
        }

        if !is_motion(&event) {
            self.busy = true;
        }

        match &event {
            WindowEvent::CloseRequested => {
                log::info!("close requested");
                self.quit = true;
            }

            WindowEvent::KeyboardInput { event: key, .. }
                if key.state == ElementState::Pressed
                    && key.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.quit = true;
            }

            WindowEvent::Resized(size) => {
                self.client_size = *size;
                self.pending_resize = Some(*size);
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(w) = &self.window {
                    let size = w.inner_size();
                    self.client_size = size;
                    self.pending_resize = Some(size);
                }
            }

            _ => {}
        }
    }
}

/// Pointer movement updates input state without interrupting the frame.
fn is_motion(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::CursorMoved { .. }
            | WindowEvent::CursorEntered { .. }
            | WindowEvent::CursorLeft { .. }
            | WindowEvent::AxisMotion { .. }
            | WindowEvent::RedrawRequested
    )
}
