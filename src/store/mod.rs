//! Persistence of card classifications inside the snapshot database.
//!
//! # Overview
//!
//! - [`ClassificationStore`] - idempotent upserts and collaborator reads
//! - [`ClassificationRecord`] - one row of `twentyword_cards`
//! - [`LegalityCounts`] - legal / illegal / unclassified buckets
//! - [`CardVerdict`] - typed name-lookup result
//! - [`StoreError`] - operation error types
//!
//! # Example
//!
//! ```ignore
//! use twmtg_core::store::{ClassificationRecord, ClassificationStore};
//! use twmtg_core::Database;
//!
//! let db = Database::new_in_memory().await?;
//! let store = ClassificationStore::new(db);
//! store.upsert("00000000-0000-0000-0000-000000000001", true, "Flying", 1).await?;
//! let counts = store.counts().await?;
//! ```

mod error;
mod record;
mod repository;

pub use error::{StoreDbErrorKind, StoreError};
pub use record::{
    CardRecord, CardVerdict, ClassificationRecord, LegalityCounts, Printing, SnapshotMeta,
};
pub use repository::ClassificationRepository;

use tracing::{debug, instrument};

use crate::db::Database;
use record::{LookupRow, group_by_text};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

const UPSERT_SQL: &str = r"INSERT INTO twentyword_cards (card_uuid, legal, legality_checked_text, num_words)
      VALUES (?, ?, ?, ?)
      ON CONFLICT (card_uuid) DO UPDATE SET
          legal = excluded.legal,
          legality_checked_text = excluded.legality_checked_text,
          num_words = excluded.num_words";

const COUNTS_SQL: &str = r"SELECT
          COALESCE(SUM(CASE WHEN tw.legal = 1 THEN 1 ELSE 0 END), 0) AS legal,
          COALESCE(SUM(CASE WHEN tw.legal = 0 THEN 1 ELSE 0 END), 0) AS illegal,
          COALESCE(SUM(CASE WHEN tw.card_uuid IS NULL THEN 1 ELSE 0 END), 0) AS unclassified
      FROM cards
      LEFT JOIN twentyword_cards AS tw ON cards.uuid = tw.card_uuid";

const LOOKUP_WITH_PURCHASE_URLS_SQL: &str = r"SELECT
          cards.uuid, cards.name, cards.setCode, cards.text,
          tw.legal, tw.legality_checked_text, tw.num_words,
          urls.tcgplayer AS tcgplayer
      FROM cards
      JOIN twentyword_cards AS tw ON cards.uuid = tw.card_uuid
      LEFT JOIN cardPurchaseUrls AS urls ON cards.uuid = urls.uuid
      WHERE cards.name LIKE ? AND cards.text IS NOT NULL AND cards.text != ''
      ORDER BY cards.name, cards.setCode, cards.uuid";

const LOOKUP_SQL: &str = r"SELECT
          cards.uuid, cards.name, cards.setCode, cards.text,
          tw.legal, tw.legality_checked_text, tw.num_words,
          NULL AS tcgplayer
      FROM cards
      JOIN twentyword_cards AS tw ON cards.uuid = tw.card_uuid
      WHERE cards.name LIKE ? AND cards.text IS NOT NULL AND cards.text != ''
      ORDER BY cards.name, cards.setCode, cards.uuid";

/// Reads and writes `twentyword_cards` in the snapshot database.
#[derive(Debug, Clone)]
pub struct ClassificationStore {
    db: Database,
}

impl ClassificationStore {
    /// Creates a store over an opened (and migrated) snapshot database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Inserts or fully overwrites the classification of `card_uuid`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    #[instrument(skip(self, normalized_text), fields(card_uuid = %card_uuid))]
    pub async fn upsert(
        &self,
        card_uuid: &str,
        legal: bool,
        normalized_text: &str,
        word_count: i64,
    ) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(card_uuid)
            .bind(legal)
            .bind(normalized_text)
            .bind(word_count)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Upserts `record`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    pub async fn upsert_record(&self, record: &ClassificationRecord) -> Result<()> {
        self.upsert(
            &record.card_uuid,
            record.legal,
            &record.normalized_text,
            record.word_count,
        )
        .await
    }

    /// Upserts all `records` in one transaction.
    ///
    /// Either every row of the batch is written or none is.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if any write or the commit fails.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn upsert_batch(&self, records: &[ClassificationRecord]) -> Result<u64> {
        let mut tx = self.db.pool().begin().await?;
        let mut written = 0;
        for record in records {
            written += sqlx::query(UPSERT_SQL)
                .bind(&record.card_uuid)
                .bind(record.legal)
                .bind(&record.normalized_text)
                .bind(record.word_count)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;
        debug!(written, "classification batch committed");
        Ok(written)
    }

    /// Fetches the classification of one card.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn get(&self, card_uuid: &str) -> Result<Option<ClassificationRecord>> {
        let record = sqlx::query_as::<_, ClassificationRecord>(
            "SELECT card_uuid, legal, legality_checked_text, num_words
             FROM twentyword_cards WHERE card_uuid = ?",
        )
        .bind(card_uuid)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(record)
    }

    /// Legal, illegal and unclassified counts over the upstream `cards` table.
    ///
    /// Classification rows without a matching card are not counted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn counts(&self) -> Result<LegalityCounts> {
        let counts = sqlx::query_as::<_, LegalityCounts>(COUNTS_SQL)
            .fetch_one(self.db.pool())
            .await?;
        Ok(counts)
    }

    /// Number of legal cards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn legal_count(&self) -> Result<i64> {
        Ok(self.counts().await?.legal)
    }

    /// Number of illegal cards.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn illegal_count(&self) -> Result<i64> {
        Ok(self.counts().await?.illegal)
    }

    /// Number of classified cards (`legal + illegal`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn total_count(&self) -> Result<i64> {
        Ok(self.counts().await?.total())
    }

    /// Cards without a classification row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn unclassified_count(&self) -> Result<i64> {
        Ok(self.counts().await?.unclassified)
    }

    /// Illegal share of classified cards in percent, `None` if nothing is classified.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn illegal_percentage(&self) -> Result<Option<f64>> {
        Ok(self.counts().await?.illegal_percentage())
    }

    /// Classified cards whose name matches the SQL `LIKE` `pattern`.
    ///
    /// Printings sharing identical rules text are grouped into one
    /// [`CardVerdict`]. TCGplayer links are attached when the snapshot ships
    /// a `cardPurchaseUrls` table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self), fields(pattern = %pattern))]
    pub async fn find_by_name(&self, pattern: &str) -> Result<Vec<CardVerdict>> {
        let sql = if self.db.has_table("cardPurchaseUrls").await? {
            LOOKUP_WITH_PURCHASE_URLS_SQL
        } else {
            LOOKUP_SQL
        };
        let rows = sqlx::query_as::<_, LookupRow>(sql)
            .bind(pattern)
            .fetch_all(self.db.pool())
            .await?;
        debug!(rows = rows.len(), "lookup rows fetched");
        Ok(group_by_text(rows))
    }

    /// Snapshot date and version from the upstream `meta` table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn snapshot_meta(&self) -> Result<Option<SnapshotMeta>> {
        if !self.db.has_table("meta").await? {
            return Ok(None);
        }
        let meta = sqlx::query_as::<_, SnapshotMeta>("SELECT date, version FROM meta LIMIT 1")
            .fetch_optional(self.db.pool())
            .await?;
        Ok(meta)
    }

    /// Number of upstream cards, classified or not.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn card_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cards")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Reads the next page of upstream cards ordered by `uuid`.
    ///
    /// Pass the last `uuid` of the previous page as `after` (keyset paging);
    /// pass `None` for the first page.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn card_page(&self, after: Option<&str>, limit: u32) -> Result<Vec<CardRecord>> {
        let rows = sqlx::query_as::<_, CardRecord>(
            "SELECT uuid, text FROM cards
             WHERE (?1 IS NULL OR uuid > ?1)
             ORDER BY uuid
             LIMIT ?2",
        )
        .bind(after)
        .bind(i64::from(limit))
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }
}
