//! Word-count legality.

use serde::Serialize;

/// House-rule word limit.
pub const TWENTY: usize = 20;

/// Outcome of classifying one normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub legal: bool,
    pub word_count: usize,
}

/// Counts words and compares against a fixed limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegalityClassifier {
    max_words: usize,
}

impl Default for LegalityClassifier {
    fn default() -> Self {
        Self { max_words: TWENTY }
    }
}

impl LegalityClassifier {
    #[must_use]
    pub fn new(max_words: usize) -> Self {
        Self { max_words }
    }

    #[must_use]
    pub fn max_words(&self) -> usize {
        self.max_words
    }

    /// Classifies already-normalized text.
    ///
    /// Words are the pieces between single spaces, so `""` is one (empty)
    /// word and a double space contributes an empty word.
    #[must_use]
    pub fn classify(&self, normalized: &str) -> Verdict {
        let word_count = word_count(normalized);
        Verdict {
            legal: word_count <= self.max_words,
            word_count,
        }
    }
}

/// Number of `' '`-separated tokens, empty tokens included.
#[must_use]
pub fn word_count(normalized: &str) -> usize {
    normalized.split(' ').count()
}
