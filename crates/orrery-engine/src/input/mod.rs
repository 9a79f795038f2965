//! Input identifiers and pollable input state.
//!
//! Public API is platform-agnostic; window backends translate their native
//! events into [`crate::events::Event`]s and fold them into [`InputState`].

pub(crate) mod platform;
mod state;
mod types;

pub use state::InputState;
pub use types::{Key, Modifiers, MouseButton};
