use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::events::{Event, EventDispatcher};
use crate::layer::{LayerCtx, LayerHandle, LayerStack};
use crate::logging::init_logging;
use crate::renderer::backend::WgpuBackend;
use crate::renderer::{RenderContext, RenderError, Renderer, RendererApi};
use crate::time::FrameClock;
use crate::window::{HeadlessWindow, Window, WinitWindow};

use super::config::ApplicationConfig;
use super::debug_overlay::DebugOverlay;

/// Fatal application-level conditions.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("an application is already running on this thread")]
    AlreadyRunning,

    #[error(transparent)]
    Render(#[from] RenderError),
}

thread_local! {
    static INSTANCE_CLAIMED: Cell<bool> = const { Cell::new(false) };
}

/// Claim on the per-thread application slot, released on drop.
#[derive(Debug)]
struct InstanceSlot(());

impl InstanceSlot {
    fn claim() -> Result<Self, AppError> {
        if INSTANCE_CLAIMED.with(|claimed| claimed.replace(true)) {
            log::error!("an application is already running on this thread");
            return Err(AppError::AlreadyRunning);
        }
        Ok(Self(()))
    }
}

impl Drop for InstanceSlot {
    fn drop(&mut self) {
        INSTANCE_CLAIMED.with(|claimed| claimed.set(false));
    }
}

/// Owns the window, the renderer and the layer stack, and drives the frame
/// loop.
///
/// At most one application is alive per thread.
pub struct Application {
    // Field order is drop order: layers release their resources before the
    // renderer and the window go away.
    layers: LayerStack,
    overlay: Rc<RefCell<DebugOverlay>>,
    renderer: Renderer,
    window: Box<dyn Window>,
    clock: FrameClock,
    running: bool,
    minimized: bool,
    _slot: InstanceSlot,
}

impl Application {
    /// Installs the logger from `config.logging`, then creates the window
    /// and render context selected by `config.renderer`.
    ///
    /// `RendererApi::None` gets a headless window and fails while building
    /// the renderer.
    pub fn new(config: ApplicationConfig) -> Result<Self> {
        init_logging(config.logging.clone());
        let slot = InstanceSlot::claim()?;
        let window_config = config.window_config();

        let (window, ctx): (Box<dyn Window>, RenderContext) = match config.renderer {
            RendererApi::Wgpu => {
                let window = WinitWindow::new(window_config).context("failed to create the window")?;
                let backend = WgpuBackend::new(window.native(), config.gpu_init())
                    .context("failed to initialise the wgpu backend")?;
                (Box::new(window), RenderContext::with_backend(Rc::new(backend)))
            }
            RendererApi::Headless => (
                Box::new(HeadlessWindow::new(window_config)),
                RenderContext::headless(),
            ),
            RendererApi::None => (
                Box::new(HeadlessWindow::new(window_config)),
                RenderContext::null(),
            ),
        };

        Self::assemble(slot, window, ctx)
    }

    /// Builds an application around an existing window and render context.
    pub fn with_window(window: Box<dyn Window>, ctx: RenderContext) -> Result<Self> {
        let slot = InstanceSlot::claim()?;
        Self::assemble(slot, window, ctx)
    }

    fn assemble(slot: InstanceSlot, window: Box<dyn Window>, ctx: RenderContext) -> Result<Self> {
        let renderer = Renderer::new(&ctx).map_err(AppError::from)?;
        renderer.init();

        let minimized = window.is_minimized();
        if !minimized {
            renderer.on_window_resize(window.width(), window.height());
        }
        log::info!(
            "application `{}` created ({}x{}, {})",
            window.title(),
            window.width(),
            window.height(),
            ctx.api()
        );

        let overlay = Rc::new(RefCell::new(DebugOverlay::new()));
        let mut app = Self {
            layers: LayerStack::new(),
            overlay: Rc::clone(&overlay),
            renderer,
            window,
            clock: FrameClock::new(),
            running: true,
            minimized,
            _slot: slot,
        };
        app.push_overlay(LayerHandle::from_shared(overlay))?;
        Ok(app)
    }

    /// Pushes `layer` below every overlay and attaches it.
    pub fn push_layer(&mut self, layer: impl Into<LayerHandle>) -> Result<LayerHandle> {
        let handle = layer.into();
        self.layers.push_layer(handle.clone());
        self.attach(&handle)?;
        Ok(handle)
    }

    /// Pushes `overlay` on top of the stack and attaches it.
    pub fn push_overlay(&mut self, overlay: impl Into<LayerHandle>) -> Result<LayerHandle> {
        let handle = overlay.into();
        self.layers.push_overlay(handle.clone());
        self.attach(&handle)?;
        Ok(handle)
    }

    /// Removes and detaches `layer`. Returns whether it was in the stack.
    pub fn pop_layer(&mut self, layer: &LayerHandle) -> bool {
        let removed = self.layers.pop_layer(layer);
        if removed {
            layer.borrow_mut().on_detach();
        }
        removed
    }

    pub fn pop_overlay(&mut self, overlay: &LayerHandle) -> bool {
        let removed = self.layers.pop_overlay(overlay);
        if removed {
            overlay.borrow_mut().on_detach();
        }
        removed
    }

    fn attach(&mut self, handle: &LayerHandle) -> Result<()> {
        let size = (self.window.width(), self.window.height());
        let mut ctx = LayerCtx::new(&mut self.renderer, self.window.input(), size, &mut self.running);
        let mut layer = handle.borrow_mut();
        log::debug!("attaching layer `{}`", layer.name());
        layer
            .on_attach(&mut ctx)
            .with_context(|| format!("layer `{}` failed to attach", layer.name()))
    }

    /// Single entry point for every window and input event.
    ///
    /// Close stops the loop and is consumed. Resize updates the minimized
    /// state and the viewport but keeps propagating. Layers then see the
    /// event top-down until one marks it handled.
    pub fn on_event(&mut self, event: &mut Event) {
        log::trace!("event: {event}");

        let running = &mut self.running;
        let minimized = &mut self.minimized;
        let renderer = &self.renderer;
        let mut dispatcher = EventDispatcher::new(event);
        dispatcher.on_window_close(|| {
            log::info!("window close requested");
            *running = false;
            true
        });
        dispatcher.on_window_resize(|width, height| {
            if width == 0 || height == 0 {
                *minimized = true;
            } else {
                *minimized = false;
                renderer.on_window_resize(width, height);
            }
            false
        });

        let size = (self.window.width(), self.window.height());
        let mut ctx = LayerCtx::new(&mut self.renderer, self.window.input(), size, &mut self.running);
        for layer in self.layers.iter().rev() {
            if event.handled {
                break;
            }
            layer.borrow_mut().on_event(&mut ctx, event);
        }
    }

    /// Runs one loop iteration: update and debug pass unless minimized,
    /// then present, then poll and dispatch window events.
    pub fn run_frame(&mut self) -> Result<()> {
        let time = self.clock.tick();

        if !self.minimized {
            let size = (self.window.width(), self.window.height());
            let mut ctx = LayerCtx::new(&mut self.renderer, self.window.input(), size, &mut self.running);
            for handle in self.layers.iter() {
                let mut layer = handle.borrow_mut();
                layer
                    .on_update(&mut ctx, time.dt)
                    .with_context(|| format!("layer `{}` failed to update", layer.name()))?;
            }

            let mut panel = self.overlay.borrow_mut().begin();
            for handle in self.layers.iter() {
                handle.borrow_mut().on_debug_render(&mut panel);
            }
            self.overlay.borrow_mut().end(panel);

            self.renderer.present();
        }

        for mut event in self.window.poll_events() {
            self.on_event(&mut event);
        }
        Ok(())
    }

    /// Loops until a close event or a layer stops the application.
    pub fn run(&mut self) -> Result<()> {
        log::info!("application running");
        self.clock.reset();
        while self.running {
            self.run_frame()?;
        }
        log::info!("application stopped");
        Ok(())
    }

    /// Stops the loop after the current iteration.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn render_context(&self) -> &RenderContext {
        self.renderer.context()
    }

    pub fn window(&self) -> &dyn Window {
        self.window.as_ref()
    }

    pub fn window_mut(&mut self) -> &mut dyn Window {
        self.window.as_mut()
    }

    pub fn debug_overlay(&self) -> Ref<'_, DebugOverlay> {
        self.overlay.borrow()
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        for layer in self.layers.drain().iter().rev() {
            layer.borrow_mut().on_detach();
        }
        log::debug!("application shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::layer::Layer;
    use crate::renderer::backend::HeadlessBackend;
    use crate::time::Timestep;
    use crate::window::{EventFeed, WindowConfig};

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        journal: Journal,
        handles_input: bool,
        exit_after: Option<u32>,
        updates: u32,
    }

    impl Probe {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                journal: Rc::clone(journal),
                handles_input: false,
                exit_after: None,
                updates: 0,
            }
        }

        fn handling_input(mut self) -> Self {
            self.handles_input = true;
            self
        }

        fn exiting_after(mut self, updates: u32) -> Self {
            self.exit_after = Some(updates);
            self
        }

        fn log(&self, what: &str) {
            self.journal.borrow_mut().push(format!("{}:{what}", self.name));
        }
    }

    impl Layer for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn on_attach(&mut self, _ctx: &mut LayerCtx<'_>) -> anyhow::Result<()> {
            self.log("attach");
            Ok(())
        }

        fn on_detach(&mut self) {
            self.log("detach");
        }

        fn on_update(&mut self, ctx: &mut LayerCtx<'_>, _ts: Timestep) -> anyhow::Result<()> {
            self.updates += 1;
            self.log("update");
            if self.exit_after == Some(self.updates) {
                ctx.exit();
            }
            Ok(())
        }

        fn on_debug_render(&mut self, panel: &mut crate::app::DebugPanel) {
            panel.section(self.name);
            self.log("debug");
        }

        fn on_event(&mut self, _ctx: &mut LayerCtx<'_>, event: &mut Event) {
            self.log(event.name());
            if self.handles_input {
                event.handled = true;
            }
        }
    }

    struct Failing;

    impl Layer for Failing {
        fn name(&self) -> &str {
            "Failing"
        }

        fn on_update(&mut self, _ctx: &mut LayerCtx<'_>, _ts: Timestep) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    fn headless_app() -> (Application, EventFeed, Rc<HeadlessBackend>) {
        let feed = EventFeed::new();
        let window = HeadlessWindow::with_feed(WindowConfig::default(), feed.clone());
        let backend = Rc::new(HeadlessBackend::new());
        let app = Application::with_window(Box::new(window), RenderContext::with_backend(backend.clone()))
            .unwrap();
        (app, feed, backend)
    }

    fn entries(journal: &Journal, suffix: &str) -> Vec<String> {
        journal
            .borrow()
            .iter()
            .filter(|e| e.ends_with(suffix))
            .cloned()
            .collect()
    }

    // --- construction ---

    #[test]
    fn one_application_per_thread() {
        let (app, _feed, _backend) = headless_app();

        let second = Application::with_window(
            Box::new(HeadlessWindow::new(WindowConfig::default())),
            RenderContext::headless(),
        );
        let err = second.err().unwrap();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::AlreadyRunning)));

        drop(app);
        assert!(Application::new(ApplicationConfig::default().with_renderer(RendererApi::Headless)).is_ok());
    }

    #[test]
    fn null_renderer_fails_and_releases_the_slot() {
        let config = ApplicationConfig::default().with_renderer(RendererApi::None);
        let err = Application::new(config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::Render(RenderError::UnsupportedApi { .. }))
        ));

        assert!(Application::new(ApplicationConfig::default().with_renderer(RendererApi::Headless)).is_ok());
    }

    #[test]
    fn new_installs_the_configured_logger() {
        let config = ApplicationConfig::default()
            .with_renderer(RendererApi::Headless)
            .with_logging(crate::logging::LoggingConfig::default().with_filter("info"));
        let _app = Application::new(config).unwrap();

        assert!(log::max_level() > log::LevelFilter::Off);
    }

    #[test]
    fn construction_initialises_renderer_and_overlay() {
        let (app, _feed, backend) = headless_app();
        let log = backend.frame_log();
        assert!(log.initialized);
        assert_eq!(log.viewport, (0, 0, 1280, 720));
        assert_eq!(app.layers().len(), 1);
        assert!(app.is_running());
    }

    // --- layer order ---

    #[test]
    fn updates_run_forward_and_events_run_backward() {
        let journal = Journal::default();
        let (mut app, feed, _backend) = headless_app();
        app.push_layer(Probe::new("L1", &journal)).unwrap();
        app.push_overlay(Probe::new("O1", &journal)).unwrap();
        app.push_layer(Probe::new("L2", &journal)).unwrap();

        feed.push(EventKind::KeyTyped { ch: 'a' });
        app.run_frame().unwrap();

        assert_eq!(entries(&journal, ":update"), ["L1:update", "L2:update", "O1:update"]);
        assert_eq!(entries(&journal, ":debug"), ["L1:debug", "L2:debug", "O1:debug"]);
        assert_eq!(entries(&journal, ":KeyTyped"), ["O1:KeyTyped", "L2:KeyTyped", "L1:KeyTyped"]);
    }

    #[test]
    fn handled_events_stop_propagating() {
        let journal = Journal::default();
        let (mut app, _feed, _backend) = headless_app();
        app.push_layer(Probe::new("L1", &journal)).unwrap();
        app.push_layer(Probe::new("L2", &journal).handling_input()).unwrap();

        let mut event = Event::new(EventKind::MouseButtonPressed {
            button: crate::input::MouseButton::Left,
        });
        app.on_event(&mut event);

        assert!(event.handled);
        assert_eq!(entries(&journal, "Pressed"), ["L2:MouseButtonPressed"]);
    }

    #[test]
    fn push_attaches_and_pop_detaches() {
        let journal = Journal::default();
        let (mut app, _feed, _backend) = headless_app();
        let layer = app.push_layer(Probe::new("L1", &journal)).unwrap();

        assert!(!app.pop_overlay(&layer));
        assert!(app.pop_layer(&layer));
        assert!(!app.pop_layer(&layer));
        assert_eq!(*journal.borrow(), ["L1:attach", "L1:detach"]);
    }

    #[test]
    fn drop_detaches_top_down() {
        let journal = Journal::default();
        let (mut app, _feed, _backend) = headless_app();
        app.push_layer(Probe::new("L1", &journal)).unwrap();
        app.push_overlay(Probe::new("O1", &journal)).unwrap();
        drop(app);

        assert_eq!(entries(&journal, ":detach"), ["O1:detach", "L1:detach"]);
    }

    // --- window events ---

    #[test]
    fn close_stops_the_loop_and_is_consumed() {
        let journal = Journal::default();
        let (mut app, feed, _backend) = headless_app();
        app.push_layer(Probe::new("L1", &journal)).unwrap();

        feed.push(EventKind::WindowClose);
        app.run().unwrap();

        assert!(!app.is_running());
        assert_eq!(feed.polls(), 1);
        assert!(entries(&journal, ":WindowClose").is_empty());
    }

    #[test]
    fn zero_area_resize_suspends_updates_but_keeps_polling() {
        let journal = Journal::default();
        let (mut app, feed, backend) = headless_app();
        app.push_layer(Probe::new("L1", &journal)).unwrap();

        feed.push(EventKind::WindowResize { width: 0, height: 600 });
        app.run_frame().unwrap();
        assert!(app.is_minimized());
        assert_eq!(entries(&journal, ":WindowResize"), ["L1:WindowResize"]);

        app.run_frame().unwrap();
        app.run_frame().unwrap();
        assert_eq!(entries(&journal, ":update").len(), 1);
        assert_eq!(entries(&journal, ":debug").len(), 1);
        assert_eq!(app.debug_overlay().passes(), 1);
        assert_eq!(feed.polls(), 3);

        feed.push(EventKind::WindowResize { width: 640, height: 480 });
        app.run_frame().unwrap();
        assert!(!app.is_minimized());
        assert_eq!(backend.frame_log().viewport, (0, 0, 640, 480));

        app.run_frame().unwrap();
        assert_eq!(entries(&journal, ":update").len(), 2);
    }

    // --- loop ---

    #[test]
    fn layers_can_stop_the_loop() {
        let journal = Journal::default();
        let (mut app, feed, backend) = headless_app();
        app.push_layer(Probe::new("L1", &journal).exiting_after(3)).unwrap();

        app.run().unwrap();

        assert_eq!(entries(&journal, ":update").len(), 3);
        assert_eq!(feed.polls(), 3);
        assert_eq!(backend.frame_log().frames_presented, 3);
        assert_eq!(app.debug_overlay().passes(), 3);
    }

    #[test]
    fn update_errors_name_the_layer() {
        let (mut app, _feed, _backend) = headless_app();
        app.push_layer(Failing).unwrap();

        let err = app.run_frame().unwrap_err();
        assert_eq!(err.to_string(), "layer `Failing` failed to update");
        assert_eq!(err.root_cause().to_string(), "boom");
    }

    #[test]
    fn overlay_collects_every_layers_section() {
        let journal = Journal::default();
        let (mut app, _feed, _backend) = headless_app();
        app.push_layer(Probe::new("L1", &journal)).unwrap();

        app.run_frame().unwrap();

        let overlay = app.debug_overlay();
        let titles: Vec<&str> = overlay
            .last_panel()
            .sections()
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert_eq!(titles, ["L1", "Frame"]);
    }
}
