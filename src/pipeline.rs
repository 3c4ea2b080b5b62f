//! End-to-end snapshot sync and classification.
//!
//! A run walks `Idle → CheckingChecksum → Fetching → Decompressing →
//! Classifying → Done`; `Fetching` and `Decompressing` are skipped when the
//! cache is already current. Every step is awaited in order and any failure
//! ends the run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, info, instrument, trace};

use crate::cache::files::exists;
use crate::cache::{AssetSource, CachedAsset, ChecksumError, ChecksumStore};
use crate::classify::{LegalityClassifier, TextNormalizer, evaluate};
use crate::config::Settings;
use crate::db::{Database, DatabaseOptions};
use crate::decompress::{DecompressError, Decompressor};
use crate::fetch::{AssetFetcher, FetchError, HttpClient};
use crate::store::{
    ClassificationRecord, ClassificationRepository, ClassificationStore, StoreError,
};

/// Fatal pipeline failures. No step is retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The checksum endpoint failed; the cache was not touched.
    #[error("remote checksum unavailable: {0}")]
    RemoteUnavailable(#[source] FetchError),

    /// The asset download failed; the cache is not marked refreshed.
    #[error("asset fetch failed: {0}")]
    FetchFailed(#[source] FetchError),

    /// The decompression tool failed; no decompressed output was left behind.
    #[error("decompression failed: {0}")]
    DecompressionFailed(#[source] DecompressError),

    /// The snapshot database could not be opened, read or written.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    /// Local cache file or directory I/O failed.
    #[error("cache I/O error on {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    fn cache_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheIo {
            path: path.into(),
            source,
        }
    }

    /// Download failures; local disk errors are reported as cache I/O.
    fn fetch(error: FetchError) -> Self {
        match error {
            FetchError::Io { path, source } => Self::CacheIo { path, source },
            other => Self::FetchFailed(other),
        }
    }

    fn decompress(error: DecompressError) -> Self {
        match error {
            DecompressError::Io { path, source } => Self::CacheIo { path, source },
            other => Self::DecompressionFailed(other),
        }
    }
}

impl From<ChecksumError> for PipelineError {
    fn from(error: ChecksumError) -> Self {
        match error {
            ChecksumError::Remote(source) => Self::RemoteUnavailable(source),
            ChecksumError::Io { path, source } => Self::CacheIo { path, source },
        }
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    CheckingChecksum,
    Fetching,
    Decompressing,
    Classifying,
    Done,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::CheckingChecksum => "checking_checksum",
            Self::Fetching => "fetching",
            Self::Decompressing => "decompressing",
            Self::Classifying => "classifying",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// Handle to the verified, decompressed snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHandle {
    /// Decompressed `SQLite` snapshot.
    pub path: PathBuf,
    /// The compressed asset was downloaded during this call.
    pub refreshed: bool,
    /// The decompression tool ran during this call.
    pub decompressed: bool,
}

/// Counters of one classification pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyTally {
    pub scanned: u64,
    pub classified: u64,
    /// Cards with null or empty text; no row is written for them.
    pub skipped: u64,
    pub legal: u64,
    pub illegal: u64,
}

/// Summary of a completed [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: bool,
    pub decompressed: bool,
    pub scanned: u64,
    pub classified: u64,
    pub skipped: u64,
    pub legal: u64,
    pub illegal: u64,
    pub state: PipelineState,
}

/// Progress of the classification pass, shared with a display task.
#[derive(Debug, Clone, Default)]
pub struct ClassifyProgress {
    scanned: Arc<AtomicU64>,
    total: Arc<AtomicU64>,
}

impl ClassifyProgress {
    #[must_use]
    pub fn scanned(&self) -> u64 {
        self.scanned.load(Ordering::Relaxed)
    }

    /// Number of cards in the snapshot, `0` until classification starts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    fn start(&self, total: u64) {
        self.scanned.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    fn advance(&self, cards: u64) {
        self.scanned.fetch_add(cards, Ordering::Relaxed);
    }
}

/// Checksum-verified snapshot sync followed by classification of every card.
///
/// The cache directory must not be shared with another concurrently running
/// pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    source: AssetSource,
    cache_dir: PathBuf,
    checksums: ChecksumStore,
    fetcher: AssetFetcher,
    decompressor: Decompressor,
    normalizer: TextNormalizer,
    classifier: LegalityClassifier,
    batch_size: u32,
    db_options: DatabaseOptions,
    progress: ClassifyProgress,
}

impl Pipeline {
    /// Builds a pipeline from resolved settings. No I/O is performed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::FetchFailed`] if a URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(settings: &Settings) -> Result<Self, PipelineError> {
        let source = AssetSource::new(&settings.asset_url, &settings.checksum_url)
            .map_err(PipelineError::FetchFailed)?;
        let client = HttpClient::new(settings.timeouts).map_err(PipelineError::FetchFailed)?;
        let asset = CachedAsset::new(&settings.cache_dir, source.key());
        debug!(
            key = %source.key(),
            cache_dir = %settings.cache_dir.display(),
            "pipeline configured"
        );

        Ok(Self {
            checksums: ChecksumStore::new(client.clone(), &source, asset),
            fetcher: AssetFetcher::new(client),
            decompressor: Decompressor::new(settings.decompress.clone()),
            normalizer: TextNormalizer::default(),
            classifier: LegalityClassifier::default(),
            batch_size: settings.batch_size.max(1),
            db_options: DatabaseOptions {
                create_if_missing: false,
                ..settings.db
            },
            progress: ClassifyProgress::default(),
            cache_dir: settings.cache_dir.clone(),
            source,
        })
    }

    /// Replaces the text normalizer (e.g. custom filter phrases).
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    #[must_use]
    pub fn asset(&self) -> &CachedAsset {
        self.checksums.asset()
    }

    #[must_use]
    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    /// Shared progress counters for the classification pass.
    #[must_use]
    pub fn progress(&self) -> ClassifyProgress {
        self.progress.clone()
    }

    /// Refreshes the cached asset if the remote checksum changed and makes
    /// sure the decompressed snapshot exists.
    ///
    /// A refresh invalidates the checksum record, streams the asset to a temp
    /// file, drops the stale decompressed output, renames the temp file into
    /// place and only then records the new checksum. An interruption at any
    /// point leaves no matching record, so the next call refetches.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::RemoteUnavailable`] if the checksum cannot be fetched
    /// - [`PipelineError::FetchFailed`] if the asset download fails
    /// - [`PipelineError::DecompressionFailed`] if the tool fails
    /// - [`PipelineError::CacheIo`] on local file errors
    #[instrument(skip(self), fields(key = %self.source.key()))]
    pub async fn ensure_snapshot(&self) -> Result<SnapshotHandle, PipelineError> {
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| PipelineError::cache_io(&self.cache_dir, e))?;

        transition(PipelineState::CheckingChecksum);
        let compressed = self.asset().compressed_path();
        let refreshed = match self.checksums.needs_refresh().await? {
            Some(checksum) => {
                transition(PipelineState::Fetching);
                self.checksums.invalidate().await?;
                let (temp, bytes) = self
                    .fetcher
                    .fetch_to_temp(self.source.asset_url(), compressed)
                    .await
                    .map_err(PipelineError::fetch)?;
                self.decompressor
                    .invalidate(compressed)
                    .await
                    .map_err(PipelineError::decompress)?;
                self.fetcher
                    .commit(&temp, compressed)
                    .await
                    .map_err(PipelineError::fetch)?;
                self.checksums.record(&checksum).await?;
                info!(bytes, %checksum, "snapshot asset refreshed");
                true
            }
            None => false,
        };

        let output = self.asset().decompressed_path();
        let had_output = exists(&output)
            .await
            .map_err(|e| PipelineError::cache_io(&output, e))?;
        if !had_output {
            transition(PipelineState::Decompressing);
        }
        let path = self
            .decompressor
            .ensure_decompressed(compressed)
            .await
            .map_err(PipelineError::decompress)?;

        Ok(SnapshotHandle {
            path,
            refreshed,
            decompressed: !had_output,
        })
    }

    /// Syncs the snapshot and classifies every card in it.
    ///
    /// # Errors
    ///
    /// Any [`PipelineError`]; persistence failures abort the run without
    /// per-card tolerance.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let snapshot = self.ensure_snapshot().await?;

        transition(PipelineState::Classifying);
        let store = open_store(&snapshot.path, self.db_options).await?;
        let result = self.classify_cards(&store, &store).await;
        store.database().clone().close().await;
        let tally = result?;

        transition(PipelineState::Done);
        info!(
            scanned = tally.scanned,
            classified = tally.classified,
            skipped = tally.skipped,
            legal = tally.legal,
            illegal = tally.illegal,
            "classification complete"
        );

        Ok(RunReport {
            fetched: snapshot.refreshed,
            decompressed: snapshot.decompressed,
            scanned: tally.scanned,
            classified: tally.classified,
            skipped: tally.skipped,
            legal: tally.legal,
            illegal: tally.illegal,
            state: PipelineState::Done,
        })
    }

    /// Classifies all cards read from `cards`, writing through `repository`.
    ///
    /// Cards are read in `uuid` order one page at a time; each page's
    /// classifications are written as one batch before the next page is read.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PersistenceFailure`] on the first read or
    /// write failure.
    pub async fn classify_cards(
        &self,
        cards: &ClassificationStore,
        repository: &dyn ClassificationRepository,
    ) -> Result<ClassifyTally, PipelineError> {
        let total = cards.card_count().await?;
        self.progress.start(u64::try_from(total).unwrap_or(0));

        let mut tally = ClassifyTally::default();
        let mut after: Option<String> = None;
        loop {
            let page = cards.card_page(after.as_deref(), self.batch_size).await?;
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.uuid.clone());

            let mut batch = Vec::with_capacity(page.len());
            for card in &page {
                tally.scanned += 1;
                let Some((normalized, verdict)) =
                    evaluate(&self.normalizer, &self.classifier, card.text.as_deref())
                else {
                    trace!(uuid = %card.uuid, "card has no text, skipping");
                    tally.skipped += 1;
                    continue;
                };
                if verdict.legal {
                    tally.legal += 1;
                } else {
                    tally.illegal += 1;
                }
                batch.push(ClassificationRecord::from_verdict(
                    &card.uuid, normalized, verdict,
                ));
            }

            if !batch.is_empty() {
                repository.upsert_batch(&batch).await?;
                tally.classified += batch.len() as u64;
            }
            self.progress.advance(page.len() as u64);

            if page.len() < self.batch_size as usize {
                break;
            }
        }
        Ok(tally)
    }

    /// Ensures the snapshot and opens its classification store for reads.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::ensure_snapshot`], plus
    /// [`PipelineError::PersistenceFailure`] if the database cannot be opened.
    pub async fn open_store(&self) -> Result<ClassificationStore, PipelineError> {
        let snapshot = self.ensure_snapshot().await?;
        open_store(&snapshot.path, self.db_options).await
    }
}

async fn open_store(
    path: &Path,
    options: DatabaseOptions,
) -> Result<ClassificationStore, PipelineError> {
    let db = Database::open(path, options)
        .await
        .map_err(|e| StoreError::Open(e.to_string()))?;
    Ok(ClassificationStore::new(db))
}

fn transition(state: PipelineState) {
    debug!(%state, "pipeline state");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::decompress::DecompressCommand;
    use crate::store::{LegalityCounts, StoreDbErrorKind};
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use crate::test_support::{FixtureCard, card_uuid, create_cards_table, insert_card, snapshot_bytes};

    const ASSET_PATH: &str = "/AllPrintings.sqlite.bz2";
    const CHECKSUM_PATH: &str = "/AllPrintings.sqlite.bz2.sha256";
    const LONG_TEXT: &str =
        "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty twentyone";

    fn settings(server: &MockServer, cache_dir: &Path, program: &str) -> Settings {
        Settings {
            cache_dir: cache_dir.to_path_buf(),
            asset_url: format!("{}{ASSET_PATH}", server.uri()),
            checksum_url: format!("{}{CHECKSUM_PATH}", server.uri()),
            decompress: DecompressCommand::bare(program),
            batch_size: 2,
            ..Settings::default()
        }
    }

    async fn mount(server: &MockServer, checksum: &str, asset: Vec<u8>, asset_calls: u64) {
        Mock::given(method("GET"))
            .and(path(CHECKSUM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(checksum))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(ASSET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(asset))
            .expect(asset_calls)
            .mount(server)
            .await;
    }

    async fn three_cards() -> Vec<u8> {
        let one = card_uuid(1);
        let two = card_uuid(2);
        let three = card_uuid(3);
        let cards: [FixtureCard<'_>; 3] = [
            (one.as_str(), "Serra Angel", "LEA", Some("Flying, vigilance")),
            (two.as_str(), "Wordy Wizard", "LEA", Some(LONG_TEXT)),
            (three.as_str(), "Vanilla Bear", "LEA", None),
        ];
        snapshot_bytes(&cards).await
    }

    async fn counts_at(path: &Path) -> LegalityCounts {
        let store = open_store(path, DatabaseOptions::default()).await.unwrap();
        let counts = store.counts().await.unwrap();
        store.database().clone().close().await;
        counts
    }

    fn cache_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_fetches_decompresses_and_classifies() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let cache = tempfile::tempdir().unwrap();
        mount(&server, "sum-1", three_cards().await, 1).await;
        let pipeline = Pipeline::new(&settings(&server, cache.path(), "cat")).unwrap();

        let report = pipeline.run().await.unwrap();

        assert_eq!(
            report,
            RunReport {
                fetched: true,
                decompressed: true,
                scanned: 3,
                classified: 2,
                skipped: 1,
                legal: 1,
                illegal: 1,
                state: PipelineState::Done,
            }
        );
        assert_eq!(pipeline.progress().scanned(), 3);
        assert_eq!(pipeline.progress().total(), 3);
        let counts = counts_at(&pipeline.asset().decompressed_path()).await;
        assert_eq!(counts.total(), 2, "legal + illegal equals cards with text");
        assert_eq!(counts.unclassified, 1);
        let record = tokio::fs::read(pipeline.asset().checksum_record_path())
            .await
            .unwrap();
        assert_eq!(record, b"sum-1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_second_run_with_same_checksum_skips_download() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let cache = tempfile::tempdir().unwrap();
        mount(&server, "sum-1", three_cards().await, 1).await;
        let pipeline = Pipeline::new(&settings(&server, cache.path(), "cat")).unwrap();

        pipeline.run().await.unwrap();
        let second = pipeline.run().await.unwrap();

        assert!(!second.fetched);
        assert!(!second.decompressed);
        assert_eq!(second.classified, 2);
        let counts = counts_at(&pipeline.asset().decompressed_path()).await;
        assert_eq!(counts.total(), 2, "rerun upserts instead of duplicating");
        server.verify().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_changed_checksum_refreshes_asset_and_output() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let cache = tempfile::tempdir().unwrap();
        mount(&server, "sum-1", three_cards().await, 1).await;
        let pipeline = Pipeline::new(&settings(&server, cache.path(), "cat")).unwrap();
        pipeline.run().await.unwrap();

        server.reset().await;
        let four = card_uuid(4);
        let replacement: [FixtureCard<'_>; 1] = [(four.as_str(), "New Card", "NEW", Some("Draw a card."))];
        mount(&server, "sum-2", snapshot_bytes(&replacement).await, 1).await;

        let handle = pipeline.ensure_snapshot().await.unwrap();

        assert!(handle.refreshed);
        assert!(handle.decompressed, "stale output must be rebuilt");
        let record = tokio::fs::read(pipeline.asset().checksum_record_path())
            .await
            .unwrap();
        assert_eq!(record, b"sum-2");
        let store = open_store(&handle.path, DatabaseOptions::default())
            .await
            .unwrap();
        assert_eq!(store.card_count().await.unwrap(), 1);
        assert!(store.get(&card_uuid(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_checksum_failure_is_remote_unavailable_and_writes_nothing() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let cache = tempfile::tempdir().unwrap();
        Mock::given(method("GET"))
            .and(path(CHECKSUM_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ASSET_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let pipeline = Pipeline::new(&settings(&server, cache.path(), "cat")).unwrap();

        let result = pipeline.run().await;

        assert!(matches!(result, Err(PipelineError::RemoteUnavailable(_))));
        assert!(cache_entries(cache.path()).is_empty());
    }

    #[tokio::test]
    async fn test_asset_failure_is_fetch_failed_without_record() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let cache = tempfile::tempdir().unwrap();
        Mock::given(method("GET"))
            .and(path(CHECKSUM_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("sum-1"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(ASSET_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let pipeline = Pipeline::new(&settings(&server, cache.path(), "cat")).unwrap();

        let result = pipeline.ensure_snapshot().await;

        match result {
            Err(PipelineError::FetchFailed(error)) => assert_eq!(error.status(), Some(500)),
            other => panic!("expected FetchFailed, got {other:?}"),
        }
        assert!(cache_entries(cache.path()).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_decompression_failure_leaves_no_output() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let cache = tempfile::tempdir().unwrap();
        mount(&server, "sum-1", b"not bzip2".to_vec(), 1).await;
        let pipeline = Pipeline::new(&settings(&server, cache.path(), "false")).unwrap();

        let result = pipeline.run().await;

        assert!(matches!(
            result,
            Err(PipelineError::DecompressionFailed(_))
        ));
        assert!(!pipeline.asset().decompressed_path().exists());
        assert!(pipeline.asset().compressed_path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_corrupt_snapshot_is_persistence_failure() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        let cache = tempfile::tempdir().unwrap();
        mount(&server, "sum-1", b"definitely not sqlite".repeat(64), 1).await;
        let pipeline = Pipeline::new(&settings(&server, cache.path(), "cat")).unwrap();

        let result = pipeline.run().await;

        assert!(matches!(result, Err(PipelineError::PersistenceFailure(_))));
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let settings = Settings {
            asset_url: "ftp://example.com/cards.bz2".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            Pipeline::new(&settings),
            Err(PipelineError::FetchFailed(FetchError::InvalidUrl { .. }))
        ));
    }

    struct FailingRepository {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ClassificationRepository for FailingRepository {
        async fn upsert(&self, _record: &ClassificationRecord) -> crate::store::Result<()> {
            unreachable!("pipeline writes in batches")
        }

        async fn upsert_batch(&self, _records: &[ClassificationRecord]) -> crate::store::Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Database {
                kind: StoreDbErrorKind::BusyOrLocked,
                message: "database is locked".to_string(),
            })
        }

        async fn counts(&self) -> crate::store::Result<LegalityCounts> {
            Ok(LegalityCounts::default())
        }
    }

    #[tokio::test]
    async fn test_write_failure_aborts_classification() {
        let db = Database::new_in_memory().await.unwrap();
        create_cards_table(&db).await;
        for n in 1..=5 {
            insert_card(&db, &card_uuid(n), "Card", "SET", Some("Flying")).await;
        }
        let cards = ClassificationStore::new(db);
        let repository = FailingRepository {
            calls: AtomicUsize::new(0),
        };
        let settings = Settings {
            batch_size: 2,
            ..Settings::default()
        };
        let pipeline = Pipeline::new(&settings).unwrap();

        let result = pipeline.classify_cards(&cards, &repository).await;

        assert!(matches!(
            result,
            Err(PipelineError::PersistenceFailure(StoreError::Database {
                kind: StoreDbErrorKind::BusyOrLocked,
                ..
            }))
        ));
        assert_eq!(repository.calls.load(Ordering::SeqCst), 1, "no write after the first failure");
        assert_eq!(pipeline.progress().scanned(), 0);
    }

    #[tokio::test]
    async fn test_classify_cards_pages_through_everything() {
        let db = Database::new_in_memory().await.unwrap();
        create_cards_table(&db).await;
        for n in 1..=5 {
            insert_card(&db, &card_uuid(n), "Card", "SET", Some("Flying")).await;
        }
        insert_card(&db, &card_uuid(6), "Blank", "SET", Some("")).await;
        let store = ClassificationStore::new(db);
        let settings = Settings {
            batch_size: 2,
            ..Settings::default()
        };
        let pipeline = Pipeline::new(&settings).unwrap();

        let tally = pipeline.classify_cards(&store, &store).await.unwrap();

        assert_eq!(
            tally,
            ClassifyTally {
                scanned: 6,
                classified: 5,
                skipped: 1,
                legal: 5,
                illegal: 0,
            }
        );
        assert!(store.get(&card_uuid(6)).await.unwrap().is_none());
        assert_eq!(store.legal_count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_custom_normalizer_filter_phrases_apply_to_classification() {
        let db = Database::new_in_memory().await.unwrap();
        create_cards_table(&db).await;
        insert_card(&db, &card_uuid(1), "Wordy Wizard", "LEA", Some(LONG_TEXT)).await;
        let store = ClassificationStore::new(db);
        let pipeline = Pipeline::new(&Settings::default())
            .unwrap()
            .with_normalizer(TextNormalizer::with_filter_phrases([" twentyone"]));

        let tally = pipeline.classify_cards(&store, &store).await.unwrap();

        assert_eq!(tally.legal, 1);
        let record = store.get(&card_uuid(1)).await.unwrap().unwrap();
        assert_eq!(record.word_count, 20);
        assert!(record.normalized_text.ends_with("twenty"));
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(PipelineState::default(), PipelineState::Idle);
        assert_eq!(PipelineState::CheckingChecksum.to_string(), "checking_checksum");
        assert_eq!(PipelineState::Done.to_string(), "done");
    }
}
