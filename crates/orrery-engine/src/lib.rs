//! Orrery engine crate.
//!
//! A backend-agnostic renderer (buffers, vertex arrays, shaders, cameras)
//! with a layered application runtime on top of it. Resources are created
//! through a [`renderer::RenderContext`] whose backend is fixed at startup.

pub mod app;
pub mod events;
pub mod input;
pub mod layer;
pub mod logging;
pub mod renderer;
pub mod time;
pub mod window;
