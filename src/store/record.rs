//! Typed rows read from and written to the snapshot database.

use serde::Serialize;
use sqlx::FromRow;

use crate::classify::Verdict;

/// One row of `twentyword_cards`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ClassificationRecord {
    pub card_uuid: String,
    pub legal: bool,
    /// Fully normalized text that was counted.
    #[sqlx(rename = "legality_checked_text")]
    pub normalized_text: String,
    #[sqlx(rename = "num_words")]
    pub word_count: i64,
}

impl ClassificationRecord {
    #[must_use]
    pub fn from_verdict(card_uuid: impl Into<String>, normalized_text: String, verdict: Verdict) -> Self {
        Self {
            card_uuid: card_uuid.into(),
            legal: verdict.legal,
            normalized_text,
            word_count: i64::try_from(verdict.word_count).unwrap_or(i64::MAX),
        }
    }
}

/// Upstream card row as consumed by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CardRecord {
    pub uuid: String,
    pub text: Option<String>,
}

/// Legality buckets across the upstream `cards` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct LegalityCounts {
    pub legal: i64,
    pub illegal: i64,
    /// Cards with no classification row (null/empty text or not yet processed).
    pub unclassified: i64,
}

impl LegalityCounts {
    /// Classified cards: `legal + illegal`.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.legal + self.illegal
    }

    /// Share of classified cards that are illegal, rounded to whole percent
    /// with ties going to the even neighbour (12.5 becomes 12).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn illegal_percentage(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| ((self.illegal as f64 / total as f64) * 100.0).round_ties_even())
    }
}

/// One printing of a card in a lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Printing {
    pub card_uuid: String,
    pub set_code: Option<String>,
    pub tcgplayer_link: Option<String>,
}

/// Lookup result: one entry per distinct rules text of a matching card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardVerdict {
    pub name: String,
    /// Raw upstream rules text.
    pub text: String,
    pub normalized_text: String,
    pub legal: bool,
    pub word_count: i64,
    pub printings: Vec<Printing>,
}

/// Upstream snapshot build information from the `meta` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct SnapshotMeta {
    pub date: String,
    pub version: String,
}

/// Flat row of the lookup query before grouping.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct LookupRow {
    pub uuid: String,
    pub name: String,
    #[sqlx(rename = "setCode")]
    pub set_code: Option<String>,
    pub text: String,
    pub legal: bool,
    pub legality_checked_text: String,
    pub num_words: i64,
    pub tcgplayer: Option<String>,
}

/// Groups lookup rows by identical raw text, keeping first-seen order.
pub(crate) fn group_by_text(rows: Vec<LookupRow>) -> Vec<CardVerdict> {
    let mut grouped: Vec<CardVerdict> = Vec::new();
    for row in rows {
        let printing = Printing {
            card_uuid: row.uuid,
            set_code: row.set_code,
            tcgplayer_link: row.tcgplayer,
        };
        if let Some(existing) = grouped.iter_mut().find(|v| v.text == row.text) {
            existing.printings.push(printing);
            continue;
        }
        grouped.push(CardVerdict {
            name: row.name,
            text: row.text,
            normalized_text: row.legality_checked_text,
            legal: row.legal,
            word_count: row.num_words,
            printings: vec![printing],
        });
    }
    grouped
}
