//! Window and input events plus typed dispatch.

mod dispatcher;
mod event;

pub use dispatcher::EventDispatcher;
pub use event::{Event, EventCategory, EventKind};
