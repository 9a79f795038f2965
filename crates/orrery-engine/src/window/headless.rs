use std::cell::RefCell;
use std::rc::Rc;

use crate::events::{Event, EventKind};
use crate::input::InputState;

use super::{Window, WindowConfig};

#[derive(Debug, Default)]
struct FeedState {
    pending: Vec<EventKind>,
    polls: u64,
}

/// Script handle for a [`HeadlessWindow`].
///
/// Clones share the same feed, so a test can keep one while the window is
/// owned by the application.
#[derive(Debug, Clone, Default)]
pub struct EventFeed {
    inner: Rc<RefCell<FeedState>>,
}

impl EventFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event for the next poll.
    pub fn push(&self, kind: EventKind) {
        self.inner.borrow_mut().pending.push(kind);
    }

    pub fn extend(&self, kinds: impl IntoIterator<Item = EventKind>) {
        self.inner.borrow_mut().pending.extend(kinds);
    }

    /// Number of times the window has been polled.
    pub fn polls(&self) -> u64 {
        self.inner.borrow().polls
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }
}

/// Display-less window fed by an [`EventFeed`].
#[derive(Debug)]
pub struct HeadlessWindow {
    config: WindowConfig,
    width: u32,
    height: u32,
    feed: EventFeed,
    input: InputState,
}

impl HeadlessWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self::with_feed(config, EventFeed::new())
    }

    pub fn with_feed(config: WindowConfig, feed: EventFeed) -> Self {
        log::debug!(
            "headless window `{}` ({}x{})",
            config.title,
            config.width,
            config.height
        );
        Self {
            width: config.width,
            height: config.height,
            config,
            feed,
            input: InputState::default(),
        }
    }

    pub fn feed(&self) -> EventFeed {
        self.feed.clone()
    }
}

impl Window for HeadlessWindow {
    fn title(&self) -> &str {
        &self.config.title
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn poll_events(&mut self) -> Vec<Event> {
        let kinds = {
            let mut feed = self.feed.inner.borrow_mut();
            feed.polls += 1;
            std::mem::take(&mut feed.pending)
        };

        kinds
            .into_iter()
            .map(|kind| {
                if let EventKind::WindowResize { width, height } = kind {
                    self.width = width;
                    self.height = height;
                }
                let event = Event::new(kind);
                self.input.apply(&event);
                event
            })
            .collect()
    }

    fn input(&self) -> &InputState {
        &self.input
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.config.vsync = enabled;
    }

    fn is_vsync(&self) -> bool {
        self.config.vsync
    }
}
