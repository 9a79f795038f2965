//! Frame timing.
//!
//! The application loop ticks one `FrameClock` per iteration and hands the
//! resulting `Timestep` to every layer's update.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime, Timestep};
