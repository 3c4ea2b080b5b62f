//! Connection management for the decompressed card snapshot.
//!
//! The MTGJSON snapshot is itself a `SQLite` database. This module opens it with:
//! - A small connection pool (single writer during a run)
//! - WAL mode for file-backed databases
//! - The embedded migration that creates the derived `twentyword_cards` table
//!
//! # Example
//!
//! ```no_run
//! use twmtg_core::{Database, DatabaseOptions};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::open(Path::new("AllPrintings.sqlite"), DatabaseOptions::default()).await?;
//! // Use db for queries...
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// Default maximum number of connections in the pool.
/// Kept low for SQLite since it uses file-level locking.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in milliseconds.
/// Connections will wait this long before returning SQLITE_BUSY.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connection(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool tuning for the snapshot database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Upper bound on pooled connections.
    pub max_connections: u32,
    /// Per-connection busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
    /// Create the database file when it does not exist.
    ///
    /// Off by default: a missing snapshot means the pipeline never produced
    /// one, and silently creating an empty file would hide that.
    pub create_if_missing: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            create_if_missing: false,
        }
    }
}

/// Snapshot database wrapper with connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the snapshot database at `db_path`.
    ///
    /// This will:
    /// 1. Connect with the configured pool size and busy timeout
    /// 2. Enable WAL mode
    /// 3. Run any pending migrations (creates `twentyword_cards`)
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument(skip(db_path, options), fields(path = %db_path.display()))]
    pub async fn open(db_path: &Path, options: DatabaseOptions) -> Result<Self, DbError> {
        // Path goes in verbatim; a URL would split on `?` and percent-decode.
        let connect_options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(options.create_if_missing)
            .busy_timeout(Duration::from_millis(u64::from(options.busy_timeout_ms)));

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .connect_with(connect_options)
            .await?;

        // Enable WAL mode for concurrent reads
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!(
            max_connections = options.max_connections,
            busy_timeout_ms = options.busy_timeout_ms,
            "snapshot database ready"
        );

        Ok(Self { pool })
    }

    /// Creates an in-memory database for testing.
    ///
    /// WAL mode is not enabled for in-memory databases as it provides no benefit.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checks if WAL mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the query fails.
    #[instrument(skip(self))]
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0.to_lowercase() == "wal")
    }

    /// Returns whether a table with `name` exists in the snapshot.
    ///
    /// Upstream auxiliary tables (`meta`, `cardPurchaseUrls`) are optional;
    /// readers probe before joining against them.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the query fails.
    pub async fn has_table(&self, name: &str) -> Result<bool, DbError> {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Gracefully closes all connections in the pool.
    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_new_in_memory_succeeds() {
        let db = Database::new_in_memory().await;
        assert!(db.is_ok(), "Failed to create in-memory database");
    }

    #[tokio::test]
    async fn test_database_migration_creates_classification_table() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO twentyword_cards VALUES ('00000000-0000-0000-0000-000000000000', 1, 'Flying', 1)",
        )
        .execute(db.pool())
        .await;

        assert!(
            result.is_ok(),
            "twentyword_cards should exist after migration"
        );
        assert!(db.has_table("twentyword_cards").await.unwrap());
    }

    #[tokio::test]
    async fn test_database_card_uuid_is_primary_key() {
        let db = Database::new_in_memory().await.unwrap();
        let insert = "INSERT INTO twentyword_cards VALUES ('dup', 1, 'Flying', 1)";

        sqlx::query(insert).execute(db.pool()).await.unwrap();
        let second = sqlx::query(insert).execute(db.pool()).await;

        assert!(second.is_err(), "duplicate card_uuid must be rejected");
    }

    #[tokio::test]
    async fn test_database_open_with_tempfile_enables_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("snapshot.sqlite");
        let options = DatabaseOptions {
            create_if_missing: true,
            ..DatabaseOptions::default()
        };

        let db = Database::open(&db_path, options).await.unwrap();

        assert!(db.is_wal_enabled().await.unwrap());
        db.close().await;
    }

    #[tokio::test]
    async fn test_database_open_missing_file_without_create_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("missing.sqlite");

        let result = Database::open(&db_path, DatabaseOptions::default()).await;

        assert!(matches!(result, Err(DbError::Connection(_))));
        assert!(!db_path.exists(), "open must not create the snapshot file");
    }

    #[tokio::test]
    async fn test_database_open_under_directory_with_url_metacharacters() {
        let temp_dir = tempfile::tempdir().unwrap();
        let options = DatabaseOptions {
            create_if_missing: true,
            ..DatabaseOptions::default()
        };

        for dir_name in ["cards?v2", "100%41"] {
            let dir = temp_dir.path().join(dir_name);
            std::fs::create_dir_all(&dir).unwrap();
            let db_path = dir.join(".key.out");

            let db = Database::open(&db_path, options).await.unwrap();
            assert!(db.has_table("twentyword_cards").await.unwrap());
            db.close().await;

            assert!(db_path.exists(), "snapshot must land at {}", db_path.display());
        }
        assert!(!temp_dir.path().join("100A").exists());
    }

    #[tokio::test]
    async fn test_database_has_table_false_for_unknown_table() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(!db.has_table("cardPurchaseUrls").await.unwrap());
    }
}
