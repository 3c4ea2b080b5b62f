//! Repository trait seam for classification persistence.
//!
//! The classification pass writes through this trait so failure paths can be
//! exercised without a broken database.

use async_trait::async_trait;

use super::{ClassificationRecord, ClassificationStore, LegalityCounts, Result};

/// Data-access contract for classification writes and aggregates.
#[async_trait]
pub trait ClassificationRepository: Send + Sync {
    /// Inserts or overwrites one classification.
    async fn upsert(&self, record: &ClassificationRecord) -> Result<()>;

    /// Inserts or overwrites a batch atomically; returns rows written.
    async fn upsert_batch(&self, records: &[ClassificationRecord]) -> Result<u64>;

    /// Legality buckets over the upstream cards.
    async fn counts(&self) -> Result<LegalityCounts>;
}

#[async_trait]
impl ClassificationRepository for ClassificationStore {
    async fn upsert(&self, record: &ClassificationRecord) -> Result<()> {
        ClassificationStore::upsert_record(self, record).await
    }

    async fn upsert_batch(&self, records: &[ClassificationRecord]) -> Result<u64> {
        ClassificationStore::upsert_batch(self, records).await
    }

    async fn counts(&self) -> Result<LegalityCounts> {
        ClassificationStore::counts(self).await
    }
}
