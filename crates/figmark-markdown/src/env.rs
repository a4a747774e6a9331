//! Per-call render environment.

use std::collections::HashMap;

/// State scoped to a single top-level parse or render call.
///
/// A fresh `Env` is created by [`MarkdownParser::render`](crate::MarkdownParser::render)
/// and threaded through every core rule, so counters never leak between
/// renders, even when one parser is shared by several threads. It also holds
/// the link reference definitions of the document, so fragments parsed later
/// with [`MarkdownParser::parse_inline`](crate::MarkdownParser::parse_inline)
/// can use them.
#[derive(Debug, Default)]
pub struct Env {
    counters: HashMap<&'static str, usize>,
    references: HashMap<String, (String, String)>,
}

impl Env {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the named counter and return its new value (first call returns 1).
    pub fn next(&mut self, counter: &'static str) -> usize {
        let value = self.counters.entry(counter).or_insert(0);
        *value += 1;
        *value
    }

    /// Current value of the named counter (0 if never incremented).
    #[must_use]
    pub fn current(&self, counter: &str) -> usize {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    /// Record a link reference definition. The first definition of a label wins.
    pub fn define_reference(&mut self, label: &str, dest: String, title: String) {
        self.references
            .entry(normalize_label(label))
            .or_insert((dest, title));
    }

    /// Destination and title of a link reference, matched case-insensitively.
    #[must_use]
    pub fn reference(&self, label: &str) -> Option<(&str, &str)> {
        self.references
            .get(&normalize_label(label))
            .map(|(dest, title)| (dest.as_str(), title.as_str()))
    }
}

/// Case-fold a label and collapse inner whitespace.
fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
