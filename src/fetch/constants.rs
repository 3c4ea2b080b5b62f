//! Constants for the fetch module (endpoints, timeouts).

/// MTGJSON compressed `SQLite` snapshot.
pub const MTGJSON_SQLITE_ASSET_URL: &str = "https://mtgjson.com/api/v5/AllPrintings.sqlite.bz2";

/// Published SHA-256 of [`MTGJSON_SQLITE_ASSET_URL`]; used only for change detection.
pub const MTGJSON_SQLITE_CHECKSUM_URL: &str =
    "https://mtgjson.com/api/v5/AllPrintings.sqlite.bz2.sha256";

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (30 minutes; the snapshot is several hundred MB).
pub const READ_TIMEOUT_SECS: u64 = 1800;
