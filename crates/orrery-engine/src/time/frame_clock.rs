use std::time::{Duration, Instant};

/// Time elapsed between two frames.
#[derive(Debug, Copy, Clone, Default, PartialEq, PartialOrd)]
pub struct Timestep(f32);

impl Timestep {
    #[inline]
    pub const fn from_seconds(seconds: f32) -> Self {
        Self(seconds)
    }

    #[inline]
    pub fn seconds(self) -> f32 {
        self.0
    }

    #[inline]
    pub fn milliseconds(self) -> f32 {
        self.0 * 1000.0
    }
}

impl From<Timestep> for f32 {
    fn from(ts: Timestep) -> f32 {
        ts.0
    }
}

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous tick.
    pub dt: Timestep,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Monotonic frame clock owned by the application loop.
///
/// Delta time is clamped so a debugger pause or a long minimize does not hand
/// layers a multi-second step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Creates a clock clamping deltas to `[100µs, 250ms]`.
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Moves the baseline to now without producing a frame.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns the new snapshot.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: Timestep::from_seconds(dt.as_secs_f32()),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
