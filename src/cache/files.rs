//! Small filesystem helpers shared by the cache, fetcher and decompressor.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Suffix for in-flight files that must never be trusted.
pub(crate) const PART_SUFFIX: &str = ".part";

/// Appends `suffix` to the final component of `path` (`a/.key` → `a/.key.out`).
#[must_use]
pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Writes `contents` to `path` via a synced temp file and rename.
///
/// Readers observe either the previous file or the complete new one.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let temp = with_suffix(path, PART_SUFFIX);
    let result = async {
        let mut file = File::create(&temp).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, path).await
    }
    .await;

    if result.is_err() {
        let _ = fs::remove_file(&temp).await;
    }
    result
}

/// Removes `path`, treating "already absent" as success.
///
/// Returns whether a file was actually removed.
pub(crate) async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error),
    }
}

/// Async existence probe that does not follow the error path for missing files.
pub(crate) async fn exists(path: &Path) -> io::Result<bool> {
    fs::try_exists(path).await
}
