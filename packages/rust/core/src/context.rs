//! Bounded context carried from finished sections into later prompts.

use std::collections::VecDeque;

use reportgen_text::truncate_chars;

/// Summary characters kept per section for content prompts.
pub const SECTION_SUMMARY_CHARS: usize = 100;

/// Sections kept as polish style reference.
pub const STYLE_REFERENCE_SECTIONS: usize = 2;

/// Combined characters of polish style reference.
pub const STYLE_REFERENCE_CHARS: usize = 300;

/// One finished section as seen by later prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub title: String,
    pub summary: String,
}

/// Rolling window of section summaries with explicit limits.
///
/// - `max_entries`: oldest entries are evicted beyond this count
/// - `max_chars`: cap applied by [`ContextWindow::combined_text`]
/// - `summary_chars`: each entry's text is truncated to this on insert
#[derive(Debug, Clone)]
pub struct ContextWindow {
    entries: VecDeque<ContextEntry>,
    max_entries: Option<usize>,
    max_chars: Option<usize>,
    summary_chars: Option<usize>,
}

impl ContextWindow {
    pub fn new(
        max_entries: Option<usize>,
        max_chars: Option<usize>,
        summary_chars: Option<usize>,
    ) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            max_chars,
            summary_chars,
        }
    }

    /// Every earlier section, each cut to a short summary.
    pub fn for_sections() -> Self {
        Self::new(None, None, Some(SECTION_SUMMARY_CHARS))
    }

    /// The two most recently polished sections, capped as a whole.
    pub fn style_reference() -> Self {
        Self::new(
            Some(STYLE_REFERENCE_SECTIONS),
            Some(STYLE_REFERENCE_CHARS),
            None,
        )
    }

    /// Add a finished section. Whitespace is flattened so each entry stays on
    /// one line.
    pub fn push(&mut self, title: impl Into<String>, text: &str) {
        let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let summary = match self.summary_chars {
            Some(limit) => truncate_chars(&flat, limit),
            None => flat,
        };
        self.entries.push_back(ContextEntry {
            title: title.into(),
            summary,
        });
        if let Some(max) = self.max_entries {
            while self.entries.len() > max {
                self.entries.pop_front();
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `- title: summary` lines, oldest first.
    pub fn summary_lines(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("- {}: {}", e.title, e.summary))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All kept text joined with spaces and capped at `max_chars`.
    pub fn combined_text(&self) -> String {
        let joined = self
            .entries
            .iter()
            .map(|e| e.summary.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        match self.max_chars {
            Some(limit) => truncate_chars(&joined, limit),
            None => joined,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
