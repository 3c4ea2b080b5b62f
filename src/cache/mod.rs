//! Local cache of the remote snapshot.
//!
//! - [`CacheKey`] / [`AssetSource`] - identity of a remote asset
//! - [`CachedAsset`] - deterministic file layout inside the cache directory
//! - [`ChecksumStore`] - decides whether the cached asset is stale
//!
//! The cache directory is owned by a single pipeline instance. Concurrent
//! runs against the same directory are not supported; callers must
//! serialize them.

mod checksum;
pub(crate) mod files;
mod key;

pub use checksum::{Checksum, ChecksumError, ChecksumStore, refresh_decision};
pub use key::{AssetSource, CacheKey, CachedAsset, decompressed_path_for};
