//! HTTP access to the remote snapshot host.
//!
//! - [`HttpClient`] - GET with timeouts, status mapping and streaming to disk
//! - [`AssetFetcher`] - temp-file-then-rename download of the compressed asset
//! - [`FetchError`] - structured errors carrying URL or path context

mod client;
mod constants;
mod error;
mod fetcher;

pub use client::{HttpClient, HttpTimeouts};
pub use constants::{
    CONNECT_TIMEOUT_SECS, MTGJSON_SQLITE_ASSET_URL, MTGJSON_SQLITE_CHECKSUM_URL, READ_TIMEOUT_SECS,
};
pub use error::FetchError;
pub use fetcher::AssetFetcher;
