use std::fmt::Display;

use crate::layer::{Layer, LayerCtx};
use crate::time::Timestep;

/// One titled group of label/value rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugSection {
    pub title: String,
    pub entries: Vec<(String, String)>,
}

/// Debug output collected from every layer during one overlay pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebugPanel {
    sections: Vec<DebugSection>,
}

impl DebugPanel {
    /// Opens a new section. Following entries land in it.
    pub fn section(&mut self, title: impl Into<String>) {
        self.sections.push(DebugSection {
            title: title.into(),
            entries: Vec::new(),
        });
    }

    /// Adds a row to the open section, opening an untitled one if needed.
    pub fn entry(&mut self, label: impl Into<String>, value: impl Display) {
        if self.sections.is_empty() {
            self.section("");
        }
        if let Some(section) = self.sections.last_mut() {
            section.entries.push((label.into(), value.to_string()));
        }
    }

    pub fn sections(&self) -> &[DebugSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FrameStats {
    frames: u32,
    elapsed: f32,
    /// Average of the last completed one-second window.
    average_ms: Option<f32>,
}

impl FrameStats {
    const REPORT_INTERVAL: f32 = 1.0;

    /// Returns the new average when a report window closes.
    fn record(&mut self, ts: Timestep) -> Option<f32> {
        self.frames += 1;
        self.elapsed += ts.seconds();
        if self.elapsed < Self::REPORT_INTERVAL {
            return None;
        }
        let average = self.elapsed * 1000.0 / self.frames as f32;
        self.average_ms = Some(average);
        self.frames = 0;
        self.elapsed = 0.0;
        Some(average)
    }
}

/// Built-in overlay that brackets the debug pass and tracks frame timing.
#[derive(Debug, Default)]
pub struct DebugOverlay {
    stats: FrameStats,
    last_dt: Timestep,
    passes: u64,
    open: bool,
    last_panel: DebugPanel,
}

impl DebugOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a pass and hands out the panel layers write into.
    pub fn begin(&mut self) -> DebugPanel {
        if self.open {
            log::warn!("debug overlay pass begun twice without end");
        }
        self.open = true;
        DebugPanel::default()
    }

    /// Closes the pass started by [`begin`](Self::begin).
    pub fn end(&mut self, panel: DebugPanel) {
        if !std::mem::take(&mut self.open) {
            log::warn!("debug overlay pass ended without begin");
            return;
        }
        self.passes += 1;
        log::trace!("debug pass {}: {} section(s)", self.passes, panel.sections.len());
        self.last_panel = panel;
    }

    /// Completed overlay passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Panel produced by the most recent completed pass.
    pub fn last_panel(&self) -> &DebugPanel {
        &self.last_panel
    }

    /// Average frame time over the last full second, once one has elapsed.
    pub fn average_frame_ms(&self) -> Option<f32> {
        self.stats.average_ms
    }
}

impl Layer for DebugOverlay {
    fn name(&self) -> &str {
        "DebugOverlay"
    }

    fn on_update(&mut self, _ctx: &mut LayerCtx<'_>, ts: Timestep) -> anyhow::Result<()> {
        self.last_dt = ts;
        if let Some(average) = self.stats.record(ts) {
            log::debug!(
                "frame time {:.2} ms ({:.0} fps)",
                average,
                1000.0 / average
            );
        }
        Ok(())
    }

    fn on_debug_render(&mut self, panel: &mut DebugPanel) {
        panel.section("Frame");
        panel.entry("dt", format_args!("{:.2} ms", self.last_dt.milliseconds()));
        if let Some(average) = self.stats.average_ms {
            panel.entry("average", format_args!("{average:.2} ms"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- panel ---

    #[test]
    fn entries_go_to_the_open_section() {
        let mut panel = DebugPanel::default();
        panel.entry("loose", 1);
        panel.section("Camera");
        panel.entry("x", 0.5);
        panel.entry("y", -2);

        let sections = panel.sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "");
        assert_eq!(sections[1].title, "Camera");
        assert_eq!(
            sections[1].entries,
            [("x".to_string(), "0.5".to_string()), ("y".to_string(), "-2".to_string())]
        );
    }

    // --- overlay ---

    #[test]
    fn begin_end_brackets_a_pass() {
        let mut overlay = DebugOverlay::new();
        let mut panel = overlay.begin();
        assert!(overlay.is_open());

        overlay.on_debug_render(&mut panel);
        overlay.end(panel);

        assert!(!overlay.is_open());
        assert_eq!(overlay.passes(), 1);
        assert_eq!(overlay.last_panel().sections()[0].title, "Frame");
    }

    #[test]
    fn end_without_begin_is_ignored() {
        let mut overlay = DebugOverlay::new();
        overlay.end(DebugPanel::default());
        assert_eq!(overlay.passes(), 0);
    }

    #[test]
    fn frame_stats_report_once_per_second() {
        let mut stats = FrameStats::default();
        let ts = Timestep::from_seconds(0.25);

        assert_eq!(stats.record(ts), None);
        assert_eq!(stats.record(ts), None);
        assert_eq!(stats.record(ts), None);
        assert_eq!(stats.record(ts), Some(250.0));
        assert_eq!(stats.frames, 0);
        assert_eq!(stats.average_ms, Some(250.0));
    }
}
