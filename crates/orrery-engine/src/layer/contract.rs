use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::app::DebugPanel;
use crate::events::Event;
use crate::input::InputState;
use crate::renderer::{RenderContext, Renderer};
use crate::time::Timestep;

/// Handles available to a layer during a callback.
pub struct LayerCtx<'a> {
    pub renderer: &'a mut Renderer,
    pub input: &'a InputState,
    window_size: (u32, u32),
    running: &'a mut bool,
}

impl<'a> LayerCtx<'a> {
    pub fn new(
        renderer: &'a mut Renderer,
        input: &'a InputState,
        window_size: (u32, u32),
        running: &'a mut bool,
    ) -> Self {
        Self {
            renderer,
            input,
            window_size,
            running,
        }
    }

    /// Context to create GPU resources with.
    pub fn render_context(&self) -> &RenderContext {
        self.renderer.context()
    }

    /// Drawable size in physical pixels.
    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    /// Asks the application to stop after the current iteration.
    pub fn exit(&mut self) {
        *self.running = false;
    }

    pub fn is_running(&self) -> bool {
        *self.running
    }
}

/// A unit of update, debug rendering and event handling in the layer stack.
///
/// Every hook has a no-op default.
pub trait Layer {
    fn name(&self) -> &str {
        "Layer"
    }

    /// Called once, right after the layer is pushed.
    fn on_attach(&mut self, ctx: &mut LayerCtx<'_>) -> anyhow::Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called once, right after the layer is popped or the application
    /// shuts down.
    fn on_detach(&mut self) {}

    fn on_update(&mut self, ctx: &mut LayerCtx<'_>, ts: Timestep) -> anyhow::Result<()> {
        let _ = (ctx, ts);
        Ok(())
    }

    fn on_debug_render(&mut self, panel: &mut DebugPanel) {
        let _ = panel;
    }

    /// Mark `event.handled` to stop it from reaching lower layers.
    fn on_event(&mut self, ctx: &mut LayerCtx<'_>, event: &mut Event) {
        let _ = (ctx, event);
    }
}

/// Shared handle to a layer. Identity is the allocation, not the value.
#[derive(Clone)]
pub struct LayerHandle(Rc<RefCell<dyn Layer>>);

impl LayerHandle {
    pub fn new<L: Layer + 'static>(layer: L) -> Self {
        Self(Rc::new(RefCell::new(layer)))
    }

    /// Wraps a layer the caller keeps a typed handle to.
    pub fn from_shared<L: Layer + 'static>(layer: Rc<RefCell<L>>) -> Self {
        Self(layer)
    }

    pub fn ptr_eq(&self, other: &LayerHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Borrows the layer for a callback.
    ///
    /// # Panics
    /// Panics if the layer is already borrowed, i.e. a layer tried to reach
    /// itself through the stack from inside one of its own hooks.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Layer + 'static> {
        self.0.borrow_mut()
    }

    pub fn name(&self) -> String {
        self.0.borrow().name().to_owned()
    }
}

impl<L: Layer + 'static> From<L> for LayerHandle {
    fn from(layer: L) -> Self {
        Self::new(layer)
    }
}

impl fmt::Debug for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(layer) => f.debug_tuple("LayerHandle").field(&layer.name()).finish(),
            Err(_) => f.write_str("LayerHandle(<borrowed>)"),
        }
    }
}
