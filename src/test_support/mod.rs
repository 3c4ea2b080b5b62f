//! Shared helpers for unit tests that need a mock HTTP server or a card snapshot.

pub mod socket_guard;

use crate::db::Database;

/// Minimal upstream `cards` table matching the MTGJSON columns this crate reads.
pub const CARDS_FIXTURE_SCHEMA: &str = r"CREATE TABLE IF NOT EXISTS cards (
    uuid VARCHAR(36) NOT NULL PRIMARY KEY,
    name TEXT,
    setCode TEXT,
    text TEXT
)";

/// Creates the upstream `cards` table in `db`.
#[allow(clippy::expect_used)]
pub async fn create_cards_table(db: &Database) {
    sqlx::query(CARDS_FIXTURE_SCHEMA)
        .execute(db.pool())
        .await
        .expect("create cards fixture table");
}

/// Inserts one upstream card row.
#[allow(clippy::expect_used)]
pub async fn insert_card(db: &Database, uuid: &str, name: &str, set_code: &str, text: Option<&str>) {
    sqlx::query("INSERT INTO cards (uuid, name, setCode, text) VALUES (?, ?, ?, ?)")
        .bind(uuid)
        .bind(name)
        .bind(set_code)
        .bind(text)
        .execute(db.pool())
        .await
        .expect("insert card fixture row");
}

/// Builds a 36-character identifier from a small integer.
#[must_use]
pub fn card_uuid(n: u32) -> String {
    format!("00000000-0000-0000-0000-{n:012}")
}

/// One upstream card for [`snapshot_bytes`]: `(uuid, name, set_code, text)`.
pub type FixtureCard<'a> = (&'a str, &'a str, &'a str, Option<&'a str>);

/// Builds a standalone `SQLite` file holding `cards` and returns its bytes.
///
/// The file uses the default rollback journal so the returned bytes are a
/// complete database on their own.
#[allow(clippy::expect_used)]
pub async fn snapshot_bytes(cards: &[FixtureCard<'_>]) -> Vec<u8> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

    let dir = tempfile::tempdir().expect("fixture temp dir");
    let path = dir.path().join("AllPrintings.sqlite");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Delete),
        )
        .await
        .expect("open fixture database");
    sqlx::query(CARDS_FIXTURE_SCHEMA)
        .execute(&pool)
        .await
        .expect("create cards fixture table");
    for &(uuid, name, set_code, text) in cards {
        sqlx::query("INSERT INTO cards (uuid, name, setCode, text) VALUES (?, ?, ?, ?)")
            .bind(uuid)
            .bind(name)
            .bind(set_code)
            .bind(text)
            .execute(&pool)
            .await
            .expect("insert card fixture row");
    }
    pool.close().await;
    std::fs::read(&path).expect("read fixture database")
}
