//! The document as the pipeline sees it: a growing sequence of text lines.
//!
//! A [`LineSource`] is whatever hosts the rendered order-history page. That
//! might be a live browser tab driven over a remote protocol, a saved text
//! dump, or a recorded fixture that replays pagination (see
//! [`crate::fixture::PagedLineSource`]). The exhaustion driver and the parser
//! only ever talk to this trait, so both run against synthetic fixtures with
//! no host environment at all.

use crate::pipeline::classify;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;

/// One trimmed, non-empty line of the flattened document text.
///
/// `index` is the position in the sequence the line was read from. Lines are
/// recomputed on every read and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub index: usize,
    pub text: String,
}

impl Line {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Access to a rendered, possibly still-growing document.
///
/// Calls are synchronous: reading the page is cheap. Waiting for it to grow
/// is the driver's job.
pub trait LineSource {
    /// Handle to a clickable element on the page.
    type Control;

    /// The document's current text, flattened into trimmed non-empty lines.
    fn current_lines(&self) -> Vec<Line>;

    /// A monotonically comparable size measure (e.g. scroll height).
    fn extent(&self) -> u64;

    /// Scroll to the bottom of the current content, which may trigger
    /// lazy loading.
    fn scroll_to_extent(&mut self);

    /// Interactive elements currently visible, with their visible text.
    fn visible_controls(&self) -> Vec<(Self::Control, String)>;

    /// First visible control whose text reads "show more" or "view more".
    fn find_load_more_control(&self) -> Option<Self::Control> {
        self.visible_controls()
            .into_iter()
            .find(|(_, label)| classify::is_load_more_label(label))
            .map(|(control, _)| control)
    }

    fn click(&mut self, control: Self::Control);
}

// ── Flattening ───────────────────────────────────────────────────────────────

/// Split a raw text dump into trimmed, non-empty [`Line`]s.
///
/// CRLF and lone CR become LF. Invisible characters (zero-width spaces, BOM,
/// soft hyphens, joiners) are stripped before trimming so a line holding only
/// a BOM does not survive as a one-character "vendor".
pub fn flatten_lines(text: &str) -> Vec<Line> {
    let text = normalise_line_endings(text);
    let text = remove_invisible_chars(&text);
    text.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(index, l)| Line::new(index, l))
        .collect()
}

/// Number a prepared sequence of strings as [`Line`]s, dropping blanks.
pub fn lines_from<S: AsRef<str>>(items: &[S]) -> Vec<Line> {
    items
        .iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(index, s)| Line::new(index, s))
        .collect()
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Static source ────────────────────────────────────────────────────────────

/// A document that is already fully loaded, e.g. a saved text dump.
///
/// Its extent never changes and it has no controls, so the driver declares
/// it exhausted after `stability_rounds` quiet rounds.
#[derive(Debug, Clone, Default)]
pub struct StaticLineSource {
    lines: Vec<Line>,
}

impl StaticLineSource {
    pub fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(flatten_lines(text))
    }
}

impl LineSource for StaticLineSource {
    type Control = Infallible;

    fn current_lines(&self) -> Vec<Line> {
        self.lines.clone()
    }

    fn extent(&self) -> u64 {
        self.lines.len() as u64
    }

    fn scroll_to_extent(&mut self) {}

    fn visible_controls(&self) -> Vec<(Infallible, String)> {
        Vec::new()
    }

    fn click(&mut self, control: Infallible) {
        match control {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_trims_and_drops_blanks() {
        let lines = flatten_lines("  Jan 5 \r\n\r\n\tTaco Place\n   \n$12.50\r");
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Jan 5", "Taco Place", "$12.50"]);
        assert_eq!(lines[2].index, 2);
    }

    #[test]
    fn flatten_strips_invisible_chars() {
        let lines = flatten_lines("\u{FEFF}\nSushi\u{200B} Bar\n\u{00AD}");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Sushi Bar");
    }

    #[test]
    fn lines_from_numbers_after_filtering() {
        let lines = lines_from(&["a", "", "  b  "]);
        assert_eq!(lines, vec![Line::new(0, "a"), Line::new(1, "b")]);
    }

    #[test]
    fn static_source_is_inert() {
        let mut src = StaticLineSource::from_text("Jan 5\nTaco Place\n$12.50");
        assert_eq!(src.extent(), 3);
        src.scroll_to_extent();
        assert_eq!(src.extent(), 3);
        assert!(src.find_load_more_control().is_none());
        assert_eq!(src.current_lines().len(), 3);
    }

    struct Labelled(Vec<&'static str>);

    impl LineSource for Labelled {
        type Control = usize;

        fn current_lines(&self) -> Vec<Line> {
            Vec::new()
        }
        fn extent(&self) -> u64 {
            0
        }
        fn scroll_to_extent(&mut self) {}
        fn visible_controls(&self) -> Vec<(usize, String)> {
            self.0
                .iter()
                .enumerate()
                .map(|(i, l)| (i, l.to_string()))
                .collect()
        }
        fn click(&mut self, _control: usize) {}
    }

    #[test]
    fn load_more_lookup_picks_first_matching_label() {
        let src = Labelled(vec!["Reorder", "Help", "VIEW MORE orders", "Show more"]);
        assert_eq!(src.find_load_more_control(), Some(2));

        let none = Labelled(vec!["Reorder", "Show less"]);
        assert_eq!(none.find_load_more_control(), None);
    }
}
