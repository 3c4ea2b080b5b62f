//! HTTP client wrapper for checksum and snapshot requests.
//!
//! This module provides the `HttpClient` struct which issues GET requests with
//! proper timeout configuration, maps failures to [`FetchError`], and streams
//! response bodies to disk.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use crate::user_agent;

/// Connect/read timeouts applied to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Connect timeout in seconds.
    pub connect_secs: u64,
    /// Whole-request timeout in seconds (covers streaming the body).
    pub read_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: CONNECT_TIMEOUT_SECS,
            read_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// HTTP client for the remote snapshot host.
///
/// Create once and share; clones reuse the same connection pool.
///
/// # Example
///
/// ```no_run
/// use twmtg_core::fetch::{HttpClient, HttpTimeouts};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(HttpTimeouts::default())?;
/// let body = client.get_bytes("https://mtgjson.com/api/v5/AllPrintings.sqlite.bz2.sha256").await?;
/// println!("checksum is {} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the underlying client cannot be built
    /// (for example, TLS backend initialization failure).
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.read_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Fetches the full body of `url` into memory.
    ///
    /// Only meant for small documents such as the published checksum.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for invalid URLs, network failures and
    /// non-success statuses.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.send_get(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url, e))?;
        debug!(bytes = body.len(), "fetched body");
        Ok(body.to_vec())
    }

    /// Streams the body of `url` into `file_path`, returning bytes written.
    ///
    /// The file is created (or truncated), written chunk by chunk through a
    /// buffered writer, flushed and synced. On error the caller owns cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for request failures, non-success statuses, a
    /// body stream interrupted mid-transfer, or disk write failures.
    #[instrument(skip(self, file_path), fields(url = %url, path = %file_path.display()))]
    pub async fn stream_to_path(&self, url: &str, file_path: &Path) -> Result<u64, FetchError> {
        let response = self.send_get(url).await?;
        let file = File::create(file_path)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;
        stream_to_file(file, response, url, file_path).await
    }

    async fn send_get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::invalid_url(url));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(file_path, e))?;
    writer
        .get_ref()
        .sync_all()
        .await
        .map_err(|e| FetchError::io(file_path, e))?;

    Ok(bytes_written)
}
