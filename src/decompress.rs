//! Expansion of the cached compressed asset.
//!
//! Decompression is delegated to an external tool (`bunzip2` by default)
//! whose stdout is captured into `<compressed>.out.part` and renamed to
//! `<compressed>.out` only after the tool exits successfully.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::cache::decompressed_path_for;
use crate::cache::files::{PART_SUFFIX, exists, remove_if_exists, with_suffix};

/// Default decompression program.
pub const DEFAULT_DECOMPRESS_PROGRAM: &str = "bunzip2";

/// Arguments placed before the input path for [`DEFAULT_DECOMPRESS_PROGRAM`].
pub const DEFAULT_DECOMPRESS_ARGS: &[&str] = &["--decompress", "--stdout", "--keep"];

/// Files `SQLite` keeps next to a database opened in WAL mode.
const SQLITE_SIDECAR_SUFFIXES: &[&str] = &["-wal", "-shm"];

/// Maximum stderr bytes carried in an error message.
const STDERR_EXCERPT_LIMIT: usize = 512;

/// Errors raised while expanding the asset.
#[derive(Debug, Error)]
pub enum DecompressError {
    /// The tool could not be started.
    #[error("failed to start decompression tool '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool exited unsuccessfully (corrupt or truncated archive).
    #[error("decompression tool '{program}' failed for {path} (exit code {code:?}): {stderr}")]
    ToolFailed {
        program: String,
        path: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    /// File system error around the output file.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DecompressError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Program and leading arguments used to decompress to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for DecompressCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_DECOMPRESS_PROGRAM.to_string(),
            args: DEFAULT_DECOMPRESS_ARGS
                .iter()
                .map(|arg| (*arg).to_string())
                .collect(),
        }
    }
}

impl DecompressCommand {
    /// Runs `program` with no leading arguments, e.g. `cat` in tests.
    #[must_use]
    pub fn bare(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

/// Expands compressed assets, skipping work already done.
#[derive(Debug, Clone, Default)]
pub struct Decompressor {
    command: DecompressCommand,
}

impl Decompressor {
    #[must_use]
    pub fn new(command: DecompressCommand) -> Self {
        Self { command }
    }

    /// Returns the decompressed path, running the tool only if it is missing.
    ///
    /// Freshness of the compressed input is not checked here; a refresh must
    /// call [`Decompressor::invalidate`] first.
    ///
    /// # Errors
    ///
    /// Returns [`DecompressError`] if the tool cannot run or exits
    /// unsuccessfully. No output file is left behind in that case.
    #[instrument(skip(self, compressed), fields(path = %compressed.display()))]
    pub async fn ensure_decompressed(&self, compressed: &Path) -> Result<PathBuf, DecompressError> {
        let output = decompressed_path_for(compressed);
        if exists(&output)
            .await
            .map_err(|e| DecompressError::io(&output, e))?
        {
            debug!(output = %output.display(), "decompressed output already present");
            return Ok(output);
        }

        info!(program = %self.command.program, "decompressing snapshot");
        let temp = with_suffix(&output, PART_SUFFIX);
        let result = match self.run_tool(compressed, &temp).await {
            Ok(()) => sync_to_disk(&temp).await,
            Err(error) => Err(error),
        };
        if let Err(error) = result {
            let _ = remove_if_exists(&temp).await;
            return Err(error);
        }

        if let Err(error) = tokio::fs::rename(&temp, &output).await {
            let _ = remove_if_exists(&temp).await;
            return Err(DecompressError::io(&output, error));
        }
        info!(output = %output.display(), "snapshot decompressed");
        Ok(output)
    }

    /// Deletes a stale decompressed output for `compressed`.
    ///
    /// `SQLite` journal sidecars of the output (`-wal`, `-shm`) go with it.
    ///
    /// # Errors
    ///
    /// Returns [`DecompressError::Io`] if a file exists but cannot be removed.
    pub async fn invalidate(&self, compressed: &Path) -> Result<bool, DecompressError> {
        let output = decompressed_path_for(compressed);
        for suffix in SQLITE_SIDECAR_SUFFIXES {
            let sidecar = with_suffix(&output, suffix);
            remove_if_exists(&sidecar)
                .await
                .map_err(|e| DecompressError::io(&sidecar, e))?;
        }
        let removed = remove_if_exists(&output)
            .await
            .map_err(|e| DecompressError::io(&output, e))?;
        if removed {
            debug!(output = %output.display(), "stale decompressed output removed");
        }
        Ok(removed)
    }

    async fn run_tool(&self, compressed: &Path, temp: &Path) -> Result<(), DecompressError> {
        let sink = tokio::fs::File::create(temp)
            .await
            .map_err(|e| DecompressError::io(temp, e))?
            .into_std()
            .await;

        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(compressed)
            .stdin(Stdio::null())
            .stdout(Stdio::from(sink))
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DecompressError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let finished = child
            .wait_with_output()
            .await
            .map_err(|e| DecompressError::io(compressed, e))?;

        if finished.status.success() {
            return Ok(());
        }

        let mut stderr = String::from_utf8_lossy(&finished.stderr).trim().to_string();
        if stderr.len() > STDERR_EXCERPT_LIMIT {
            let mut cut = STDERR_EXCERPT_LIMIT;
            while !stderr.is_char_boundary(cut) {
                cut -= 1;
            }
            stderr.truncate(cut);
        }
        Err(DecompressError::ToolFailed {
            program: self.command.program.clone(),
            path: compressed.to_path_buf(),
            code: finished.status.code(),
            stderr,
        })
    }
}

/// Flushes the tool's output to stable storage before it is renamed into place.
async fn sync_to_disk(path: &Path) -> Result<(), DecompressError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| DecompressError::io(path, e))?;
    file.sync_all()
        .await
        .map_err(|e| DecompressError::io(path, e))
}
