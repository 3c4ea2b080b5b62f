//! twmtg Core Library
//!
//! Keeps a local, checksum-verified copy of the MTGJSON card snapshot and
//! classifies every card's rules text against the twenty-word limit.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`cache`] - Cache file layout and checksum-based change detection
//! - [`fetch`] - HTTP client and streaming asset download
//! - [`decompress`] - External-tool decompression of the cached asset
//! - [`classify`] - Text normalization and word-count legality
//! - [`db`] - Snapshot database connection and derived-table migration
//! - [`store`] - Classification persistence and collaborator reads
//! - [`pipeline`] - Orchestration of the steps above
//! - [`config`] - Defaults, config file and resolved settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod classify;
pub mod config;
pub mod db;
pub mod decompress;
pub mod fetch;
pub mod pipeline;
pub mod store;

pub(crate) mod user_agent;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types
pub use classify::{LegalityClassifier, TWENTY, TextNormalizer, Verdict};
pub use config::{ConfigError, FileConfig, Settings};
pub use db::{Database, DatabaseOptions, DbError};
pub use pipeline::{
    ClassifyProgress, Pipeline, PipelineError, PipelineState, RunReport, SnapshotHandle,
};
pub use store::{CardVerdict, ClassificationStore, LegalityCounts, SnapshotMeta, StoreError};

/// Version of the word-count rules applied by [`LegalityClassifier`].
pub const RULESET_VERSION: &str = "20240217";
