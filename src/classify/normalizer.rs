//! Rules-text normalization ahead of word counting.

use std::sync::LazyLock;

use regex::Regex;

/// Phrases removed verbatim after reminder text and whitespace cleanup.
pub const DEFAULT_FILTER_PHRASES: &[&str] =
    &["This spell costs {1} more to cast for each target beyond the first."];

/// Literal backslash-n escape as stored in the snapshot's `text` column.
const ESCAPED_NEWLINE: &str = "\\n";

/// Parenthesized reminder text. Non-nesting; empty `()` is left alone.
#[allow(clippy::expect_used)]
static REMINDER_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]+\)").expect("reminder text regex is valid"));

#[allow(clippy::expect_used)]
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Strips reminder text and filter phrases from a card's rules text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNormalizer {
    filter_phrases: Vec<String>,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::with_filter_phrases(DEFAULT_FILTER_PHRASES.iter().copied())
    }
}

impl TextNormalizer {
    #[must_use]
    pub fn with_filter_phrases<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filter_phrases: phrases
                .into_iter()
                .map(Into::into)
                .filter(|phrase: &String| !phrase.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn filter_phrases(&self) -> &[String] {
        &self.filter_phrases
    }

    /// Normalizes `raw` rules text.
    ///
    /// 1. escaped `\n` sequences become spaces
    /// 2. `(...)` reminder text is removed
    /// 3. trimmed, whitespace runs collapsed to a single space
    /// 4. filter phrases removed, trimmed again
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let unescaped = raw.replace(ESCAPED_NEWLINE, " ");
        let without_reminders = REMINDER_TEXT.replace_all(&unescaped, "");
        let collapsed = WHITESPACE_RUN
            .replace_all(without_reminders.trim(), " ")
            .into_owned();

        let filtered = self
            .filter_phrases
            .iter()
            .fold(collapsed, |text, phrase| text.replace(phrase.as_str(), ""));
        filtered.trim().to_string()
    }
}
