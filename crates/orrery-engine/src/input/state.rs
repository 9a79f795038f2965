use std::collections::HashSet;

use crate::events::{Event, EventKind};

use super::types::{Key, Modifiers, MouseButton};

/// Pollable input state for one window.
///
/// The window folds every event it produces into this state before handing
/// the event to the application, so layers can ask "is W held?" during
/// update instead of tracking key events themselves.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    modifiers: Modifiers,
    focused: bool,
    pointer_pos: Option<(f32, f32)>,
    keys_down: HashSet<Key>,
    buttons_down: HashSet<MouseButton>,
}

impl InputState {
    pub fn apply(&mut self, event: &Event) {
        match event.kind {
            EventKind::KeyPressed { key, modifiers, .. } => {
                self.modifiers = modifiers;
                self.keys_down.insert(key);
            }
            EventKind::KeyReleased { key, modifiers } => {
                self.modifiers = modifiers;
                self.keys_down.remove(&key);
            }
            EventKind::MouseButtonPressed { button } => {
                self.buttons_down.insert(button);
            }
            EventKind::MouseButtonReleased { button } => {
                self.buttons_down.remove(&button);
            }
            EventKind::MouseMoved { x, y } => {
                self.pointer_pos = Some((x, y));
            }
            EventKind::WindowFocus => {
                self.focused = true;
            }
            EventKind::WindowLostFocus => {
                // Releases are not delivered to an unfocused window.
                self.focused = false;
                self.keys_down.clear();
                self.buttons_down.clear();
            }
            EventKind::WindowClose
            | EventKind::WindowResize { .. }
            | EventKind::WindowMoved { .. }
            | EventKind::KeyTyped { .. }
            | EventKind::MouseScrolled { .. } => {}
        }
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// Last known pointer position in logical pixels, `(0, 0)` before the
    /// pointer has entered the window.
    pub fn mouse_position(&self) -> (f32, f32) {
        self.pointer_pos.unwrap_or((0.0, 0.0))
    }

    pub fn mouse_x(&self) -> f32 {
        self.mouse_position().0
    }

    pub fn mouse_y(&self) -> f32 {
        self.mouse_position().1
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: Key) -> Event {
        Event::new(EventKind::KeyPressed { key, repeat: false, modifiers: Modifiers::default() })
    }

    fn release(key: Key) -> Event {
        Event::new(EventKind::KeyReleased { key, modifiers: Modifiers::default() })
    }

    #[test]
    fn key_press_and_release_toggle_state() {
        let mut input = InputState::default();
        input.apply(&press(Key::W));
        assert!(input.is_key_pressed(Key::W));
        input.apply(&release(Key::W));
        assert!(!input.is_key_pressed(Key::W));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut input = InputState::default();
        input.apply(&Event::new(EventKind::WindowFocus));
        input.apply(&press(Key::A));
        input.apply(&Event::new(EventKind::MouseButtonPressed { button: MouseButton::Left }));
        assert!(input.is_focused());

        input.apply(&Event::new(EventKind::WindowLostFocus));
        assert!(!input.is_focused());
        assert!(!input.is_key_pressed(Key::A));
        assert!(!input.is_mouse_button_pressed(MouseButton::Left));
    }

    #[test]
    fn pointer_position_tracks_moves() {
        let mut input = InputState::default();
        assert_eq!(input.mouse_position(), (0.0, 0.0));
        input.apply(&Event::new(EventKind::MouseMoved { x: 12.0, y: 34.0 }));
        assert_eq!(input.mouse_x(), 12.0);
        assert_eq!(input.mouse_y(), 34.0);
    }

    #[test]
    fn key_events_carry_modifiers_into_state() {
        let mut input = InputState::default();
        let shift = Modifiers { shift: true, ..Modifiers::default() };
        input.apply(&Event::new(EventKind::KeyPressed { key: Key::Tab, repeat: false, modifiers: shift }));
        assert!(input.modifiers().shift);
        assert!(input.modifiers().any());
    }
}
