//! Runtime configuration: built-in defaults, an optional config file, CLI overrides.
//!
//! The config file lives at `$XDG_CONFIG_HOME/twmtg/config.toml` (or
//! `$HOME/.config/twmtg/config.toml`) and holds flat `key = value` lines:
//!
//! ```text
//! cache_dir = "/var/cache/twmtg"   # quoted strings
//! read_timeout_secs = 900          # bare integers
//! ```

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::db::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_MAX_CONNECTIONS, DatabaseOptions};
use crate::decompress::DecompressCommand;
use crate::fetch::{HttpTimeouts, MTGJSON_SQLITE_ASSET_URL, MTGJSON_SQLITE_CHECKSUM_URL};

/// Cards read and upserted per transaction.
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

const APP_DIR: &str = "twmtg";
const CONFIG_FILE: &str = "config.toml";
const FALLBACK_CACHE_DIR: &str = ".twmtg-cache";

/// Errors raised while reading or validating the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line is not `key = value`.
    #[error("invalid config syntax on line {line}: expected key = value")]
    Syntax { line: usize },

    /// The key is not recognised.
    #[error("unknown configuration key '{key}' on line {line}")]
    UnknownKey { key: String, line: usize },

    /// The value could not be parsed for its key.
    #[error("invalid `{key}` value on line {line}: {reason}")]
    InvalidValue {
        key: &'static str,
        line: usize,
        reason: String,
    },

    /// The value parsed but is outside the accepted range.
    #[error("invalid config value for `{key}`: {value}. Expected range: {range}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        range: &'static str,
    },
}

/// Values read from the config file; `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub cache_dir: Option<PathBuf>,
    pub asset_url: Option<String>,
    pub checksum_url: Option<String>,
    pub decompress_program: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub batch_size: Option<u32>,
    pub db_max_connections: Option<u32>,
    pub db_busy_timeout_ms: Option<u32>,
}

impl FileConfig {
    /// Parses config file contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed lines, unknown keys, unparsable
    /// values and out-of-range values.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        for (index, raw_line) in raw.lines().enumerate() {
            let line_no = index + 1;
            let line = strip_inline_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let Some((raw_key, raw_value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax { line: line_no });
            };
            let value = raw_value.trim();

            match raw_key.trim() {
                "cache_dir" => {
                    cfg.cache_dir = Some(PathBuf::from(string_value("cache_dir", value, line_no)?));
                }
                "asset_url" => cfg.asset_url = Some(string_value("asset_url", value, line_no)?),
                "checksum_url" => {
                    cfg.checksum_url = Some(string_value("checksum_url", value, line_no)?);
                }
                "decompress_program" => {
                    cfg.decompress_program =
                        Some(string_value("decompress_program", value, line_no)?);
                }
                "connect_timeout_secs" => {
                    cfg.connect_timeout_secs =
                        Some(integer_value("connect_timeout_secs", value, line_no)?);
                }
                "read_timeout_secs" => {
                    cfg.read_timeout_secs =
                        Some(integer_value("read_timeout_secs", value, line_no)?);
                }
                "batch_size" => {
                    cfg.batch_size = Some(u32_value("batch_size", value, line_no)?);
                }
                "db_max_connections" => {
                    cfg.db_max_connections = Some(u32_value("db_max_connections", value, line_no)?);
                }
                "db_busy_timeout_ms" => {
                    cfg.db_busy_timeout_ms = Some(u32_value("db_busy_timeout_ms", value, line_no)?);
                }
                unknown => {
                    return Err(ConfigError::UnknownKey {
                        key: unknown.to_string(),
                        line: line_no,
                    });
                }
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks numeric values against their accepted ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] for the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600, "1..=3600")?;
        check_range("read_timeout_secs", self.read_timeout_secs, 1, 3600, "1..=3600")?;
        check_range(
            "batch_size",
            self.batch_size.map(u64::from),
            1,
            100_000,
            "1..=100000",
        )?;
        check_range(
            "db_max_connections",
            self.db_max_connections.map(u64::from),
            1,
            20,
            "1..=20",
        )?;
        check_range(
            "db_busy_timeout_ms",
            self.db_busy_timeout_ms.map(u64::from),
            0,
            120_000,
            "0..=120000",
        )
    }
}

fn check_range(
    key: &'static str,
    value: Option<u64>,
    min: u64,
    max: u64,
    range: &'static str,
) -> Result<(), ConfigError> {
    match value {
        Some(value) if !(min..=max).contains(&value) => {
            Err(ConfigError::OutOfRange { key, value, range })
        }
        _ => Ok(()),
    }
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn string_value(key: &'static str, raw: &str, line: usize) -> Result<String, ConfigError> {
    if raw.len() < 2 || !raw.starts_with('"') || !raw.ends_with('"') {
        return Err(ConfigError::InvalidValue {
            key,
            line,
            reason: "expected double-quoted string".to_string(),
        });
    }
    Ok(raw[1..raw.len() - 1].to_string())
}

fn integer_value(key: &'static str, raw: &str, line: usize) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|error| ConfigError::InvalidValue {
        key,
        line,
        reason: error.to_string(),
    })
}

fn u32_value(key: &'static str, raw: &str, line: usize) -> Result<u32, ConfigError> {
    let value = integer_value(key, raw, line)?;
    u32::try_from(value).map_err(|_| ConfigError::InvalidValue {
        key,
        line,
        reason: "integer out of range for u32".to_string(),
    })
}

/// Config file path from the environment.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/twmtg/config.toml`
/// 2. `$HOME/.config/twmtg/config.toml`
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    config_path_from(|name| std::env::var_os(name))
}

fn config_path_from(env: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    let env = |name: &str| env(name).filter(|value| !value.is_empty());
    if let Some(base) = env("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(base).join(APP_DIR).join(CONFIG_FILE));
    }
    let home = env("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE),
    )
}

/// Cache directory used when neither the config file nor the CLI names one.
///
/// `$XDG_CACHE_HOME/twmtg`, else `$HOME/.cache/twmtg`, else `./.twmtg-cache`.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    cache_dir_from(|name| std::env::var_os(name))
}

fn cache_dir_from(env: impl Fn(&str) -> Option<OsString>) -> PathBuf {
    let env = |name: &str| env(name).filter(|value| !value.is_empty());
    if let Some(base) = env("XDG_CACHE_HOME") {
        return PathBuf::from(base).join(APP_DIR);
    }
    if let Some(home) = env("HOME") {
        return PathBuf::from(home).join(".cache").join(APP_DIR);
    }
    PathBuf::from(FALLBACK_CACHE_DIR)
}

/// Config file metadata after loading.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Path probed for the file, if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed contents when the file exists.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    #[must_use]
    pub fn loaded_from_file(&self) -> bool {
        self.config.is_some()
    }
}

/// Loads the config file from [`default_config_path`] if present.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_default_file_config() -> Result<LoadedConfig, ConfigError> {
    match default_config_path() {
        Some(path) => load_file_config(&path).map(|config| LoadedConfig {
            path: Some(path),
            config,
        }),
        None => Ok(LoadedConfig::default()),
    }
}

/// Loads `path`, returning `Ok(None)` when it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_file_config(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let config = FileConfig::parse(&raw)?;
    debug!(path = %path.display(), "config file loaded");
    Ok(Some(config))
}

/// Fully resolved settings for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub cache_dir: PathBuf,
    pub asset_url: String,
    pub checksum_url: String,
    pub decompress: DecompressCommand,
    pub timeouts: HttpTimeouts,
    pub batch_size: u32,
    pub db: DatabaseOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            asset_url: MTGJSON_SQLITE_ASSET_URL.to_string(),
            checksum_url: MTGJSON_SQLITE_CHECKSUM_URL.to_string(),
            decompress: DecompressCommand::default(),
            timeouts: HttpTimeouts::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            db: DatabaseOptions {
                max_connections: DEFAULT_MAX_CONNECTIONS,
                busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
                create_if_missing: false,
            },
        }
    }
}

impl Settings {
    /// Layers `file` over the defaults, then `cache_dir_override` (from the CLI) on top.
    #[must_use]
    pub fn resolve(file: Option<&FileConfig>, cache_dir_override: Option<PathBuf>) -> Self {
        let mut settings = Self::default();
        if let Some(file) = file {
            settings.apply_file(file);
        }
        if let Some(cache_dir) = cache_dir_override {
            settings.cache_dir = cache_dir;
        }
        settings
    }

    fn apply_file(&mut self, file: &FileConfig) {
        if let Some(cache_dir) = &file.cache_dir {
            self.cache_dir.clone_from(cache_dir);
        }
        if let Some(url) = &file.asset_url {
            self.asset_url.clone_from(url);
        }
        if let Some(url) = &file.checksum_url {
            self.checksum_url.clone_from(url);
        }
        if let Some(program) = &file.decompress_program {
            self.decompress.program.clone_from(program);
        }
        if let Some(secs) = file.connect_timeout_secs {
            self.timeouts.connect_secs = secs;
        }
        if let Some(secs) = file.read_timeout_secs {
            self.timeouts.read_secs = secs;
        }
        if let Some(batch_size) = file.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(max) = file.db_max_connections {
            self.db.max_connections = max;
        }
        if let Some(ms) = file.db_busy_timeout_ms {
            self.db.busy_timeout_ms = ms;
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cache_dir = \"{}\"", self.cache_dir.display())?;
        writeln!(f, "asset_url = \"{}\"", self.asset_url)?;
        writeln!(f, "checksum_url = \"{}\"", self.checksum_url)?;
        writeln!(f, "decompress_program = \"{}\"", self.decompress.program)?;
        writeln!(f, "connect_timeout_secs = {}", self.timeouts.connect_secs)?;
        writeln!(f, "read_timeout_secs = {}", self.timeouts.read_secs)?;
        writeln!(f, "batch_size = {}", self.batch_size)?;
        writeln!(f, "db_max_connections = {}", self.db.max_connections)?;
        write!(f, "db_busy_timeout_ms = {}", self.db.busy_timeout_ms)
    }
}
