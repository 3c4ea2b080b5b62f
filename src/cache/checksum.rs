//! Change detection for the cached asset.
//!
//! The remote checksum is fetched fresh on every check; only the *last
//! applied* value is kept locally. Values are opaque and compared
//! byte-for-byte.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, instrument};

use super::files::{exists, remove_if_exists, write_atomic};
use super::key::{AssetSource, CachedAsset};
use crate::fetch::{FetchError, HttpClient};

/// Opaque checksum value as published by the remote host.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Checksum(Vec<u8>);

impl Checksum {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(String::from_utf8_lossy(&self.0).trim())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({self})")
    }
}

/// Errors raised while deciding whether the cache is stale.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// The checksum endpoint failed or returned a non-success status.
    #[error("remote checksum unavailable: {0}")]
    Remote(#[source] FetchError),

    /// The local checksum record exists but could not be read or written.
    #[error("checksum record {path}: {source}")]
    Io {
        /// Record path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl ChecksumError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Pure refresh decision.
///
/// `None` means the cached asset is current; otherwise the fetched checksum is
/// handed back so the caller can record it once the new asset is in place.
#[must_use]
pub fn refresh_decision(
    fetched: Checksum,
    recorded: Option<&Checksum>,
    asset_present: bool,
) -> Option<Checksum> {
    match recorded {
        Some(recorded) if asset_present && *recorded == fetched => None,
        _ => Some(fetched),
    }
}

/// Tracks the last applied checksum for one [`CachedAsset`].
#[derive(Debug, Clone)]
pub struct ChecksumStore {
    client: HttpClient,
    checksum_url: String,
    asset: CachedAsset,
}

impl ChecksumStore {
    #[must_use]
    pub fn new(client: HttpClient, source: &AssetSource, asset: CachedAsset) -> Self {
        Self {
            client,
            checksum_url: source.checksum_url().to_string(),
            asset,
        }
    }

    /// Fetches the current remote checksum.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::Remote`] on any network failure or non-success status.
    #[instrument(skip(self), fields(url = %self.checksum_url))]
    pub async fn fetch_remote(&self) -> Result<Checksum, ChecksumError> {
        self.client
            .get_bytes(&self.checksum_url)
            .await
            .map(Checksum::new)
            .map_err(ChecksumError::Remote)
    }

    /// Reads the last applied checksum, `None` if no record exists.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::Io`] when the record exists but cannot be read.
    pub async fn recorded(&self) -> Result<Option<Checksum>, ChecksumError> {
        let path = self.asset.checksum_record_path();
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(Checksum::new(bytes))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(ChecksumError::io(path, error)),
        }
    }

    /// Returns `Some(fetched)` when the cached asset must be refreshed.
    ///
    /// "No refresh" requires the compressed asset and a checksum record to
    /// both exist and the freshly fetched checksum to equal the record.
    ///
    /// # Errors
    ///
    /// [`ChecksumError::Remote`] is fatal for the run: there is no fallback to
    /// a possibly stale cache. The cache is not touched in that case.
    #[instrument(skip(self))]
    pub async fn needs_refresh(&self) -> Result<Option<Checksum>, ChecksumError> {
        let fetched = self.fetch_remote().await?;
        let compressed = self.asset.compressed_path();
        let asset_present = exists(compressed)
            .await
            .map_err(|e| ChecksumError::io(compressed, e))?;
        let recorded = if asset_present {
            self.recorded().await?
        } else {
            None
        };

        let decision = refresh_decision(fetched, recorded.as_ref(), asset_present);
        match &decision {
            None => debug!(checksum = %recorded.as_ref().map(ToString::to_string).unwrap_or_default(), "cached asset is current"),
            Some(checksum) => info!(
                %checksum,
                asset_present,
                had_record = recorded.is_some(),
                "cached asset needs refresh"
            ),
        }
        Ok(decision)
    }

    /// Durably records `checksum` as applied.
    ///
    /// Call only after the matching asset has been fully written and renamed
    /// into place.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::Io`] if the record cannot be written.
    pub async fn record(&self, checksum: &Checksum) -> Result<(), ChecksumError> {
        let path = self.asset.checksum_record_path();
        write_atomic(path, checksum.as_bytes())
            .await
            .map_err(|e| ChecksumError::io(path, e))?;
        debug!(%checksum, path = %path.display(), "checksum recorded");
        Ok(())
    }

    /// Removes the checksum record so an interrupted refresh is retried.
    ///
    /// # Errors
    ///
    /// Returns [`ChecksumError::Io`] if the record exists but cannot be removed.
    pub async fn invalidate(&self) -> Result<(), ChecksumError> {
        let path = self.asset.checksum_record_path();
        remove_if_exists(path)
            .await
            .map(|_| ())
            .map_err(|e| ChecksumError::io(path, e))
    }

    #[must_use]
    pub fn asset(&self) -> &CachedAsset {
        &self.asset
    }
}
