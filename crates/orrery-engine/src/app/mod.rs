//! Application runtime: configuration, the frame loop and the built-in
//! debug overlay.

mod application;
mod config;
mod debug_overlay;

pub use application::{AppError, Application};
pub use config::ApplicationConfig;
pub use debug_overlay::{DebugOverlay, DebugPanel, DebugSection};
