//! Append-only transcript with bottom-anchored scrolling.

use crate::state::{Sender, TranscriptEntry};

// Used until the first render reports the real pane size.
const DEFAULT_WRAP_WIDTH: u16 = 50;
const DEFAULT_VIEW_HEIGHT: u16 = 20;

pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    pub scroll: u16,
    pinned: bool,

    // Inner size of the transcript pane, updated during render
    view_width: u16,
    view_height: u16,
    // Lines drawn below the last entry (the "Thinking..." indicator)
    trailing_lines: u16,
}

impl Transcript {
    /// Create a transcript whose first entry is `header`. The header survives `clear`.
    pub fn new(header: TranscriptEntry) -> Self {
        Self {
            entries: vec![header],
            scroll: 0,
            pinned: true,
            view_width: 0,
            view_height: 0,
            trailing_lines: 0,
        }
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn push(&mut self, text: impl Into<String>, sender: Sender) {
        self.entries.push(TranscriptEntry::new(text, sender));
        self.scroll_to_end();
    }

    /// Remove everything except the header entry.
    pub fn clear(&mut self) {
        self.entries.truncate(1);
        self.scroll_to_end();
    }

    pub fn scroll_to_end(&mut self) {
        self.pinned = true;
        self.scroll = self.max_scroll();
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.pinned = self.scroll >= self.max_scroll();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll());
        self.pinned = self.scroll >= self.max_scroll();
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
        self.pinned = self.max_scroll() == 0;
    }

    /// Record the pane size seen by the last render. A pinned view re-anchors to the end.
    pub fn set_viewport(&mut self, width: u16, height: u16, trailing_lines: u16) {
        self.view_width = width;
        self.view_height = height;
        self.trailing_lines = trailing_lines;
        if self.pinned {
            self.scroll = self.max_scroll();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    pub fn view_height(&self) -> u16 {
        if self.view_height > 0 {
            self.view_height
        } else {
            DEFAULT_VIEW_HEIGHT
        }
    }

    /// Total wrapped height of all entries plus the trailing lines.
    pub fn total_lines(&self) -> u16 {
        let wrap_width = if self.view_width > 0 {
            self.view_width
        } else {
            DEFAULT_WRAP_WIDTH
        };

        let body: u16 = self
            .entries
            .iter()
            .map(|entry| entry_height(entry, wrap_width))
            .fold(0u16, |acc, h| acc.saturating_add(h));
        body.saturating_add(self.trailing_lines)
    }

    fn max_scroll(&self) -> u16 {
        self.total_lines().saturating_sub(self.view_height())
    }
}

/// Rows an entry occupies at `wrap_width`: label, wrapped text, blank separator.
pub fn entry_height(entry: &TranscriptEntry, wrap_width: u16) -> u16 {
    let wrap_width = wrap_width.max(1) as usize;
    let mut lines: u16 = 1;
    for line in entry.text.lines() {
        // Character count, not byte length, for UTF-8 text
        let char_count = line.chars().count();
        let rows = if char_count == 0 {
            1
        } else {
            char_count.div_ceil(wrap_width)
        };
        lines = lines.saturating_add(rows as u16);
    }
    lines.saturating_add(1)
}
