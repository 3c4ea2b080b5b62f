//! Conditional download of the compressed snapshot.

use std::path::Path;

use tracing::{debug, info, instrument};

use super::client::HttpClient;
use super::error::FetchError;
use crate::cache::files::{PART_SUFFIX, remove_if_exists, with_suffix};

/// Streams a remote asset into the cache.
///
/// Bytes go to `<destination>.part` first and are renamed over
/// `destination` only after the whole body was received and synced, so a
/// failed or interrupted transfer never leaves a partial file at the trusted
/// path.
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: HttpClient,
}

impl AssetFetcher {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Downloads `url` to a temp sibling of `destination`.
    ///
    /// Returns the temp path and the byte count. Callers commit with
    /// [`AssetFetcher::commit`] once any dependent state has been invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on network failure, non-success status or disk
    /// failure. The temp file is removed before returning an error.
    #[instrument(skip(self, destination), fields(url = %url, destination = %destination.display()))]
    pub async fn fetch_to_temp(
        &self,
        url: &str,
        destination: &Path,
    ) -> Result<(std::path::PathBuf, u64), FetchError> {
        let temp = with_suffix(destination, PART_SUFFIX);
        debug!(temp = %temp.display(), "streaming asset");

        match self.client.stream_to_path(url, &temp).await {
            Ok(bytes) => Ok((temp, bytes)),
            Err(error) => {
                debug!(temp = %temp.display(), "cleaning up partial file after error");
                let _ = remove_if_exists(&temp).await;
                Err(error)
            }
        }
    }

    /// Renames a completed temp file over `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if the rename fails; the temp file is removed.
    pub async fn commit(&self, temp: &Path, destination: &Path) -> Result<(), FetchError> {
        if let Err(error) = tokio::fs::rename(temp, destination).await {
            let _ = remove_if_exists(temp).await;
            return Err(FetchError::io(destination, error));
        }
        Ok(())
    }

    /// Streams `url` to `destination` (temp file, sync, rename).
    ///
    /// # Errors
    ///
    /// Same as [`AssetFetcher::fetch_to_temp`] and [`AssetFetcher::commit`];
    /// `destination` is untouched on failure.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        let (temp, bytes) = self.fetch_to_temp(url, destination).await?;
        self.commit(&temp, destination).await?;
        info!(path = %destination.display(), bytes, "asset fetched");
        Ok(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fetch::HttpTimeouts;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn fetcher() -> AssetFetcher {
        AssetFetcher::new(HttpClient::new(HttpTimeouts::default()).unwrap())
    }

    #[tokio::test]
    async fn test_fetch_writes_destination_and_no_part_file() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .and(path("/AllPrintings.sqlite.bz2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"BZh91AY".to_vec()))
            .mount(&server)
            .await;
        let cache = TempDir::new().unwrap();
        let destination = cache.path().join(".key");

        let url = format!("{}/AllPrintings.sqlite.bz2", server.uri());
        let bytes = fetcher().fetch(&url, &destination).await.unwrap();

        assert_eq!(bytes, 7);
        assert_eq!(std::fs::read(&destination).unwrap(), b"BZh91AY");
        assert!(!with_suffix(&destination, PART_SUFFIX).exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_asset_and_removes_part() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        let cache = TempDir::new().unwrap();
        let destination = cache.path().join(".key");
        std::fs::write(&destination, b"previous").unwrap();

        let result = fetcher().fetch(&server.uri(), &destination).await;

        assert!(matches!(
            result,
            Err(FetchError::HttpStatus { status: 502, .. })
        ));
        assert_eq!(std::fs::read(&destination).unwrap(), b"previous");
        assert!(!with_suffix(&destination, PART_SUFFIX).exists());
    }

    #[tokio::test]
    async fn test_fetch_read_timeout_leaves_no_partial_file() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow".to_vec())
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;
        let client = HttpClient::new(HttpTimeouts {
            connect_secs: 1,
            read_secs: 1,
        })
        .unwrap();
        let cache = TempDir::new().unwrap();
        let destination = cache.path().join(".key");

        let result = AssetFetcher::new(client).fetch(&server.uri(), &destination).await;

        assert!(result.is_err(), "expected timeout, got {result:?}");
        assert!(!destination.exists());
        assert!(!with_suffix(&destination, PART_SUFFIX).exists());
    }
}
