//! Window collaborators.
//!
//! The application only sees the [`Window`] trait: a size, a title and a
//! batch of events per poll. `WinitWindow` pumps a real winit event loop;
//! `HeadlessWindow` replays a scripted feed.

mod headless;
mod winit;

use crate::events::Event;
use crate::input::InputState;

pub use self::headless::{EventFeed, HeadlessWindow};
pub use self::winit::WinitWindow;

/// Window creation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    /// Logical pixels.
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Orrery".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

pub trait Window {
    fn title(&self) -> &str;

    /// Drawable width in physical pixels.
    fn width(&self) -> u32;

    /// Drawable height in physical pixels.
    fn height(&self) -> u32;

    /// Returns every event produced since the previous poll, in order. The
    /// window's [`InputState`] already reflects them.
    fn poll_events(&mut self) -> Vec<Event>;

    fn input(&self) -> &InputState;

    /// Records the vsync preference. It applies when the surface is
    /// (re)created.
    fn set_vsync(&mut self, enabled: bool);

    fn is_vsync(&self) -> bool;

    /// Whether the drawable currently has zero area.
    fn is_minimized(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}
