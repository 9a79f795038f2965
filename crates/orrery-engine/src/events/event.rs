use std::fmt;

use crate::input::{Key, Modifiers, MouseButton};

/// Coarse grouping used for filtering events without matching every variant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventCategory {
    Application,
    Input,
    Keyboard,
    Mouse,
    MouseButton,
}

/// What happened.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum EventKind {
    WindowClose,
    WindowResize { width: u32, height: u32 },
    WindowFocus,
    WindowLostFocus,
    WindowMoved { x: i32, y: i32 },

    KeyPressed { key: Key, repeat: bool, modifiers: Modifiers },
    KeyReleased { key: Key, modifiers: Modifiers },
    KeyTyped { ch: char },

    MouseButtonPressed { button: MouseButton },
    MouseButtonReleased { button: MouseButton },
    MouseMoved { x: f32, y: f32 },
    MouseScrolled { x_offset: f32, y_offset: f32 },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::WindowClose => "WindowClose",
            EventKind::WindowResize { .. } => "WindowResize",
            EventKind::WindowFocus => "WindowFocus",
            EventKind::WindowLostFocus => "WindowLostFocus",
            EventKind::WindowMoved { .. } => "WindowMoved",
            EventKind::KeyPressed { .. } => "KeyPressed",
            EventKind::KeyReleased { .. } => "KeyReleased",
            EventKind::KeyTyped { .. } => "KeyTyped",
            EventKind::MouseButtonPressed { .. } => "MouseButtonPressed",
            EventKind::MouseButtonReleased { .. } => "MouseButtonReleased",
            EventKind::MouseMoved { .. } => "MouseMoved",
            EventKind::MouseScrolled { .. } => "MouseScrolled",
        }
    }

    pub fn categories(&self) -> &'static [EventCategory] {
        use EventCategory::*;
        match self {
            EventKind::WindowClose
            | EventKind::WindowResize { .. }
            | EventKind::WindowFocus
            | EventKind::WindowLostFocus
            | EventKind::WindowMoved { .. } => &[Application],
            EventKind::KeyPressed { .. }
            | EventKind::KeyReleased { .. }
            | EventKind::KeyTyped { .. } => &[Input, Keyboard],
            EventKind::MouseButtonPressed { .. } | EventKind::MouseButtonReleased { .. } => {
                &[Input, Mouse, MouseButton]
            }
            EventKind::MouseMoved { .. } | EventKind::MouseScrolled { .. } => &[Input, Mouse],
        }
    }
}

/// An event travelling from the window down the layer stack.
///
/// Once `handled` is set, the application stops offering the event to
/// lower layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub handled: bool,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self { kind, handled: false }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn in_category(&self, category: EventCategory) -> bool {
        self.kind.categories().contains(&category)
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Event::new(kind)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::WindowResize { width, height } => write!(f, "WindowResize: {width}, {height}"),
            EventKind::WindowMoved { x, y } => write!(f, "WindowMoved: {x}, {y}"),
            EventKind::KeyPressed { key, repeat, .. } => write!(f, "KeyPressed: {key} (repeat = {repeat})"),
            EventKind::KeyReleased { key, .. } => write!(f, "KeyReleased: {key}"),
            EventKind::KeyTyped { ch } => write!(f, "KeyTyped: {ch:?}"),
            EventKind::MouseButtonPressed { button } => write!(f, "MouseButtonPressed: {button:?}"),
            EventKind::MouseButtonReleased { button } => write!(f, "MouseButtonReleased: {button:?}"),
            EventKind::MouseMoved { x, y } => write!(f, "MouseMoved: {x}, {y}"),
            EventKind::MouseScrolled { x_offset, y_offset } => {
                write!(f, "MouseScrolled: {x_offset}, {y_offset}")
            }
            _ => f.write_str(self.name()),
        }
    }
}
