//! Builder for small MTGJSON-shaped `SQLite` snapshots.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

struct Card {
    uuid: String,
    name: String,
    set_code: String,
    text: Option<String>,
}

/// Collects cards and optional auxiliary tables, then renders database bytes.
#[derive(Default)]
pub struct SnapshotFixture {
    cards: Vec<Card>,
    meta: Option<(String, String)>,
    purchase_urls: Option<Vec<(String, String)>>,
}

impl SnapshotFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn card(mut self, uuid: &str, name: &str, set_code: &str, text: Option<&str>) -> Self {
        self.cards.push(Card {
            uuid: uuid.to_string(),
            name: name.to_string(),
            set_code: set_code.to_string(),
            text: text.map(str::to_string),
        });
        self
    }

    pub fn meta(mut self, date: &str, version: &str) -> Self {
        self.meta = Some((date.to_string(), version.to_string()));
        self
    }

    /// Adds a `cardPurchaseUrls` row; the table exists once any link is added.
    pub fn tcgplayer(mut self, uuid: &str, link: &str) -> Self {
        self.purchase_urls
            .get_or_insert_with(Vec::new)
            .push((uuid.to_string(), link.to_string()));
        self
    }

    /// Writes a rollback-journal `SQLite` file and returns its bytes.
    pub async fn bytes(&self) -> Vec<u8> {
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

        sqlx::query(
            "CREATE TABLE cards (uuid VARCHAR(36) NOT NULL PRIMARY KEY, name TEXT, setCode TEXT, text TEXT)",
        )
        .execute(&pool)
        .await
        .expect("create cards");
        for card in &self.cards {
            sqlx::query("INSERT INTO cards (uuid, name, setCode, text) VALUES (?, ?, ?, ?)")
                .bind(&card.uuid)
                .bind(&card.name)
                .bind(&card.set_code)
                .bind(&card.text)
                .execute(&pool)
                .await
                .expect("insert card");
        }

        if let Some((date, version)) = &self.meta {
            sqlx::query("CREATE TABLE meta (date TEXT, version TEXT)")
                .execute(&pool)
                .await
                .expect("create meta");
            sqlx::query("INSERT INTO meta (date, version) VALUES (?, ?)")
                .bind(date)
                .bind(version)
                .execute(&pool)
                .await
                .expect("insert meta");
        }

        if let Some(urls) = &self.purchase_urls {
            sqlx::query("CREATE TABLE cardPurchaseUrls (uuid VARCHAR(36), tcgplayer TEXT)")
                .execute(&pool)
                .await
                .expect("create cardPurchaseUrls");
            for (uuid, link) in urls {
                sqlx::query("INSERT INTO cardPurchaseUrls (uuid, tcgplayer) VALUES (?, ?)")
                    .bind(uuid)
                    .bind(link)
                    .execute(&pool)
                    .await
                    .expect("insert purchase url");
            }
        }

        pool.close().await;
        std::fs::read(&path).expect("read fixture database")
    }
}

/// Builds a 36-character identifier from a small integer.
pub fn card_uuid(n: u32) -> String {
    format!("00000000-0000-0000-0000-{n:012}")
}

/// Twenty-one space-separated words.
pub const TWENTY_ONE_WORDS: &str = "Whenever this creature attacks, each opponent loses one life and you gain one life for each card like this in graveyard.";
