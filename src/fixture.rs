//! Recorded order-history fixtures that replay pagination.
//!
//! A fixture is the page text, captured page by page. Separator lines mark
//! how the next chunk arrives:
//!
//! ```text
//! Jan 12
//! Taco Place
//! $12.50
//! --- page ---        ← revealed by scrolling to the bottom
//! Jan 3
//! Burger Spot
//! $8.00
//! --- show more ---   ← revealed by clicking a "Show more" button
//! Dec 30, 2023
//! ...
//! ```
//!
//! [`PagedLineSource`] replays such a fixture with a configurable render
//! latency, so the exhaustion driver sees growth arrive a few polls after
//! it asked for it, the way a real page behaves.

use crate::error::OrderTallyError;
use crate::source::{flatten_lines, Line, LineSource};
use std::cell::Cell;
use std::path::Path;
use tracing::debug;

/// Separator for a chunk that loads on scroll.
pub const PAGE_BREAK: &str = "--- page ---";

/// Separator for a chunk that loads behind a "Show more" button.
pub const SHOW_MORE_BREAK: &str = "--- show more ---";

/// Label of the simulated load-more button.
const SHOW_MORE_LABEL: &str = "Show more orders";

/// How a chunk of the fixture becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    Scroll,
    ShowMore,
}

/// One chunk of the recorded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturePage {
    pub reveal: Reveal,
    pub text: String,
}

/// Handle to a simulated button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureControl {
    /// Reveals the chunk at this index.
    ShowMore(usize),
    /// Visible but does nothing when clicked.
    Inert(usize),
}

/// Split fixture text into pages on the separator lines.
///
/// The first page is always visible; its `reveal` is [`Reveal::Scroll`].
pub fn parse_fixture(text: &str) -> Vec<FixturePage> {
    let mut pages = vec![FixturePage {
        reveal: Reveal::Scroll,
        text: String::new(),
    }];
    for raw in text.lines() {
        let reveal = match raw.trim() {
            PAGE_BREAK => Some(Reveal::Scroll),
            SHOW_MORE_BREAK => Some(Reveal::ShowMore),
            _ => None,
        };
        match reveal {
            Some(reveal) => pages.push(FixturePage {
                reveal,
                text: String::new(),
            }),
            None => {
                // `pages` always has at least the first page.
                if let Some(page) = pages.last_mut() {
                    page.text.push_str(raw);
                    page.text.push('\n');
                }
            }
        }
    }
    pages
}

/// Read and parse a fixture file.
pub async fn load_fixture(path: impl AsRef<Path>) -> Result<PagedLineSource, OrderTallyError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            OrderTallyError::FixtureNotFound {
                path: path.to_path_buf(),
            }
        } else {
            OrderTallyError::FixtureRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let pages = parse_fixture(&text);
    debug!("Loaded fixture {} ({} pages)", path.display(), pages.len());
    Ok(PagedLineSource::new(pages))
}

/// A [`LineSource`] that replays a paged fixture.
///
/// Scrolling (or clicking the button, for [`Reveal::ShowMore`] chunks)
/// requests the next chunk; it becomes visible on the `latency + 1`-th
/// extent read after the request. The extent is the number of visible lines.
#[derive(Debug)]
pub struct PagedLineSource {
    pages: Vec<FixturePage>,
    line_counts: Vec<u64>,
    revealed: Cell<usize>,
    pending: Cell<Option<usize>>,
    latency: usize,
    decoys: Vec<String>,
}

impl PagedLineSource {
    pub fn new(pages: Vec<FixturePage>) -> Self {
        let line_counts = pages
            .iter()
            .map(|p| flatten_lines(&p.text).len() as u64)
            .collect();
        let revealed = pages.len().min(1);
        Self {
            pages,
            line_counts,
            revealed: Cell::new(revealed),
            pending: Cell::new(None),
            latency: 0,
            decoys: Vec::new(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(parse_fixture(text))
    }

    /// Extent reads that pass between a request and the chunk showing up.
    pub fn with_latency(mut self, polls: usize) -> Self {
        self.latency = polls;
        self
    }

    /// Add a visible button that is not a load-more control.
    pub fn with_decoy_control(mut self, label: impl Into<String>) -> Self {
        self.decoys.push(label.into());
        self
    }

    pub fn pages_revealed(&self) -> usize {
        self.revealed.get()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// How the next hidden chunk arrives, unless one is already on its way.
    fn next_reveal(&self) -> Option<Reveal> {
        if self.pending.get().is_some() {
            return None;
        }
        self.pages.get(self.revealed.get()).map(|p| p.reveal)
    }

    /// Advance the simulated render clock by one read.
    fn tick(&self) {
        match self.pending.get() {
            Some(0) => {
                self.pending.set(None);
                self.revealed.set(self.revealed.get() + 1);
            }
            Some(n) => self.pending.set(Some(n - 1)),
            None => {}
        }
    }
}

impl LineSource for PagedLineSource {
    type Control = FixtureControl;

    fn current_lines(&self) -> Vec<Line> {
        let text: String = self.pages[..self.revealed.get()]
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        flatten_lines(&text)
    }

    fn extent(&self) -> u64 {
        self.tick();
        self.line_counts[..self.revealed.get()].iter().sum()
    }

    fn scroll_to_extent(&mut self) {
        if self.next_reveal() == Some(Reveal::Scroll) {
            self.pending.set(Some(self.latency));
        }
    }

    fn visible_controls(&self) -> Vec<(FixtureControl, String)> {
        let mut controls: Vec<(FixtureControl, String)> = self
            .decoys
            .iter()
            .enumerate()
            .map(|(i, label)| (FixtureControl::Inert(i), label.clone()))
            .collect();
        if self.next_reveal() == Some(Reveal::ShowMore) {
            controls.push((
                FixtureControl::ShowMore(self.revealed.get()),
                SHOW_MORE_LABEL.to_string(),
            ));
        }
        controls
    }

    fn click(&mut self, control: FixtureControl) {
        if let FixtureControl::ShowMore(idx) = control {
            if idx == self.revealed.get() && self.next_reveal() == Some(Reveal::ShowMore) {
                self.pending.set(Some(self.latency));
            }
        }
    }
}
