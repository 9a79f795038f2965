//! Layers and the ordered stack the application drives.

mod contract;
mod stack;

pub use contract::{Layer, LayerCtx, LayerHandle};
pub use stack::LayerStack;
