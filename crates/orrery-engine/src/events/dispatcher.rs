use crate::input::{Key, MouseButton};

use super::event::{Event, EventCategory, EventKind};

/// Routes one event to a typed handler.
///
/// Each `on_*` call runs its handler only when the event matches, and ORs
/// the handler's return value into `event.handled`. Handlers never clear a
/// flag set by someone else.
pub struct EventDispatcher<'a> {
    event: &'a mut Event,
}

impl<'a> EventDispatcher<'a> {
    pub fn new(event: &'a mut Event) -> Self {
        Self { event }
    }

    pub fn event(&self) -> &Event {
        self.event
    }

    fn mark(&mut self, handled: bool) -> bool {
        self.event.handled |= handled;
        true
    }

    /// Runs `f` when the event belongs to `category`. Returns whether it ran.
    pub fn dispatch(&mut self, category: EventCategory, f: impl FnOnce(&EventKind) -> bool) -> bool {
        if !self.event.in_category(category) {
            return false;
        }
        let handled = f(&self.event.kind);
        self.mark(handled)
    }

    pub fn on_window_close(&mut self, f: impl FnOnce() -> bool) -> bool {
        match self.event.kind {
            EventKind::WindowClose => {
                let handled = f();
                self.mark(handled)
            }
            _ => false,
        }
    }

    pub fn on_window_resize(&mut self, f: impl FnOnce(u32, u32) -> bool) -> bool {
        match self.event.kind {
            EventKind::WindowResize { width, height } => {
                let handled = f(width, height);
                self.mark(handled)
            }
            _ => false,
        }
    }

    pub fn on_key_pressed(&mut self, f: impl FnOnce(Key, bool) -> bool) -> bool {
        match self.event.kind {
            EventKind::KeyPressed { key, repeat, .. } => {
                let handled = f(key, repeat);
                self.mark(handled)
            }
            _ => false,
        }
    }

    pub fn on_key_released(&mut self, f: impl FnOnce(Key) -> bool) -> bool {
        match self.event.kind {
            EventKind::KeyReleased { key, .. } => {
                let handled = f(key);
                self.mark(handled)
            }
            _ => false,
        }
    }

    pub fn on_key_typed(&mut self, f: impl FnOnce(char) -> bool) -> bool {
        match self.event.kind {
            EventKind::KeyTyped { ch } => {
                let handled = f(ch);
                self.mark(handled)
            }
            _ => false,
        }
    }

    pub fn on_mouse_button_pressed(&mut self, f: impl FnOnce(MouseButton) -> bool) -> bool {
        match self.event.kind {
            EventKind::MouseButtonPressed { button } => {
                let handled = f(button);
                self.mark(handled)
            }
            _ => false,
        }
    }

    pub fn on_mouse_button_released(&mut self, f: impl FnOnce(MouseButton) -> bool) -> bool {
        match self.event.kind {
            EventKind::MouseButtonReleased { button } => {
                let handled = f(button);
                self.mark(handled)
            }
            _ => false,
        }
    }

    pub fn on_mouse_moved(&mut self, f: impl FnOnce(f32, f32) -> bool) -> bool {
        match self.event.kind {
            EventKind::MouseMoved { x, y } => {
                let handled = f(x, y);
                self.mark(handled)
            }
            _ => false,
        }
    }

    pub fn on_mouse_scrolled(&mut self, f: impl FnOnce(f32, f32) -> bool) -> bool {
        match self.event.kind {
            EventKind::MouseScrolled { x_offset, y_offset } => {
                let handled = f(x_offset, y_offset);
                self.mark(handled)
            }
            _ => false,
        }
    }
}
