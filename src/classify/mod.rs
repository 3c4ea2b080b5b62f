//! Pure text transforms applied to every card.
//!
//! [`TextNormalizer`] strips what does not count, [`LegalityClassifier`]
//! counts what is left. Neither touches I/O.

mod legality;
mod normalizer;

pub use legality::{LegalityClassifier, TWENTY, Verdict, word_count};
pub use normalizer::{DEFAULT_FILTER_PHRASES, TextNormalizer};

/// Normalizes and classifies raw rules text.
///
/// Returns `None` for missing or empty text: such cards are skipped, not
/// classified as illegal.
#[must_use]
pub fn evaluate(
    normalizer: &TextNormalizer,
    classifier: &LegalityClassifier,
    raw: Option<&str>,
) -> Option<(String, Verdict)> {
    let raw = raw.filter(|text| !text.is_empty())?;
    let normalized = normalizer.normalize(raw);
    let verdict = classifier.classify(&normalized);
    Some((normalized, verdict))
}
