use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window as NativeWindow, WindowId};

use crate::events::{Event, EventKind};
use crate::input::platform::winit::translate_window_event;
use crate::input::{InputState, Modifiers};

use super::{Window, WindowConfig};

/// Pumps allowed while waiting for the platform to hand out the window.
const CREATE_ATTEMPTS: u32 = 200;
const CREATE_PUMP_TIMEOUT: Duration = Duration::from_millis(5);

/// A desktop window driven by pumping a winit event loop on every poll.
///
/// The application keeps ownership of the frame loop; winit only runs for
/// the duration of [`Window::poll_events`].
pub struct WinitWindow {
    event_loop: EventLoop<()>,
    handler: PumpHandler,
    window: Arc<NativeWindow>,
    input: InputState,
}

struct PumpHandler {
    config: WindowConfig,
    window: Option<Arc<NativeWindow>>,
    create_error: Option<anyhow::Error>,
    modifiers: Modifiers,
    pending: Vec<EventKind>,
}

impl PumpHandler {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<Arc<NativeWindow>> {
        let attrs = NativeWindow::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        Ok(Arc::new(window))
    }
}

impl ApplicationHandler for PumpHandler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match self.create_window(event_loop) {
            Ok(window) => self.window = Some(window),
            Err(e) => self.create_error = Some(e),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        translate_window_event(window, &mut self.modifiers, &event, &mut self.pending);
    }
}

impl WinitWindow {
    /// Creates the event loop and the window.
    ///
    /// Must be called on the main thread on platforms that require it.
    pub fn new(config: WindowConfig) -> Result<Self> {
        let mut event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut handler = PumpHandler {
            config,
            window: None,
            create_error: None,
            modifiers: Modifiers::default(),
            pending: Vec::new(),
        };

        for _ in 0..CREATE_ATTEMPTS {
            let status = event_loop.pump_app_events(Some(CREATE_PUMP_TIMEOUT), &mut handler);
            if let Some(err) = handler.create_error.take() {
                return Err(err);
            }
            if let PumpStatus::Exit(code) = status {
                anyhow::bail!("event loop exited with code {code} before the window was created");
            }
            if let Some(window) = handler.window.clone() {
                log::info!(
                    "window `{}` created ({}x{})",
                    handler.config.title,
                    handler.config.width,
                    handler.config.height
                );
                return Ok(Self {
                    event_loop,
                    handler,
                    window,
                    input: InputState::default(),
                });
            }
        }

        anyhow::bail!("platform did not create the window")
    }

    /// Native window, for surface creation.
    pub fn native(&self) -> Arc<NativeWindow> {
        Arc::clone(&self.window)
    }
}

impl Window for WinitWindow {
    fn title(&self) -> &str {
        &self.handler.config.title
    }

    fn width(&self) -> u32 {
        self.window.inner_size().width
    }

    fn height(&self) -> u32 {
        self.window.inner_size().height
    }

    fn poll_events(&mut self) -> Vec<Event> {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler);

        let mut kinds = std::mem::take(&mut self.handler.pending);
        if let PumpStatus::Exit(code) = status {
            log::debug!("event loop exited with code {code}");
            kinds.push(EventKind::WindowClose);
        }

        kinds
            .into_iter()
            .map(|kind| {
                let event = Event::new(kind);
                self.input.apply(&event);
                event
            })
            .collect()
    }

    fn input(&self) -> &InputState {
        &self.input
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.handler.config.vsync = enabled;
    }

    fn is_vsync(&self) -> bool {
        self.handler.config.vsync
    }
}
