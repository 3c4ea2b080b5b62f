//! Cache identity: which remote asset a set of local files belongs to.

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha224};
use url::Url;

use super::files::with_suffix;
use crate::fetch::FetchError;

/// Stable fingerprint of an (asset URL, checksum URL) pair.
///
/// Lowercase hex SHA-224 of the asset URL bytes followed by the checksum URL
/// bytes, so several sources can share one cache directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a URL pair.
    #[must_use]
    pub fn from_urls(asset_url: &str, checksum_url: &str) -> Self {
        let mut hasher = Sha224::new();
        hasher.update(asset_url.as_bytes());
        hasher.update(checksum_url.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remote compressed asset and the endpoint publishing its checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSource {
    asset_url: String,
    checksum_url: String,
    key: CacheKey,
}

impl AssetSource {
    /// Validates both URLs and derives the cache key.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if either URL does not parse or is
    /// not http(s).
    pub fn new(asset_url: &str, checksum_url: &str) -> Result<Self, FetchError> {
        validate_http_url(asset_url)?;
        validate_http_url(checksum_url)?;
        Ok(Self {
            asset_url: asset_url.to_string(),
            checksum_url: checksum_url.to_string(),
            key: CacheKey::from_urls(asset_url, checksum_url),
        })
    }

    #[must_use]
    pub fn asset_url(&self) -> &str {
        &self.asset_url
    }

    #[must_use]
    pub fn checksum_url(&self) -> &str {
        &self.checksum_url
    }

    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

fn validate_http_url(raw: &str) -> Result<(), FetchError> {
    let parsed = Url::parse(raw).map_err(|_| FetchError::invalid_url(raw))?;
    if matches!(parsed.scheme(), "http" | "https") {
        Ok(())
    } else {
        Err(FetchError::invalid_url(raw))
    }
}

/// Local files belonging to one [`CacheKey`] inside a cache directory.
///
/// | file                    | contents                          |
/// |-------------------------|-----------------------------------|
/// | `.<key>`                | compressed asset bytes            |
/// | `.<key>.out`            | decompressed snapshot             |
/// | `.<key>.checksum`       | last applied remote checksum      |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    compressed: PathBuf,
    checksum_record: PathBuf,
}

impl CachedAsset {
    /// Lays out the file names for `key` under `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: &Path, key: &CacheKey) -> Self {
        let compressed = cache_dir.join(format!(".{key}"));
        let checksum_record = with_suffix(&compressed, ".checksum");
        Self {
            compressed,
            checksum_record,
        }
    }

    /// Compressed asset path.
    #[must_use]
    pub fn compressed_path(&self) -> &Path {
        &self.compressed
    }

    /// Decompressed snapshot path (may not exist yet).
    #[must_use]
    pub fn decompressed_path(&self) -> PathBuf {
        decompressed_path_for(&self.compressed)
    }

    /// Last-applied checksum record path.
    #[must_use]
    pub fn checksum_record_path(&self) -> &Path {
        &self.checksum_record
    }
}

/// Where the decompressor writes the expanded form of `compressed`.
#[must_use]
pub fn decompressed_path_for(compressed: &Path) -> PathBuf {
    with_suffix(compressed, ".out")
}
