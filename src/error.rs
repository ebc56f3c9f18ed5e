//! Structured error types, one enum per component boundary (spec §7).
//!
//! Follows the teacher's `src/error.rs` split (`IndexError`/`ParseError`/
//! `StorageError`, `#[from]` conversions, a `Result` alias per subsystem)
//! rather than one grab-bag error type.

use crate::types::Id;
use std::path::PathBuf;
use thiserror::Error;

/// Input/read errors (spec §7 "Input errors"). Always collected per file,
/// never fatal to the batch.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file '{path}' exceeds max_file_bytes ({size} > {limit})")]
    TooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    #[error("invalid UTF-8 in '{path}'")]
    InvalidUtf8 { path: PathBuf },
}

/// IR cache errors (spec §7 "Cache errors"). Read failures trigger rebuild;
/// write failures are logged and ignored — never surfaced as a build
/// failure.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("disk cache I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupted cache entry at '{path}': {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("failed to (de)serialize cache entry: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Cross-file resolution errors (spec §7). Never fatal; an unresolved
/// reference becomes a recorded fact, not an error return.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("ambiguous reference to '{name}': {candidates} candidates")]
    Ambiguous { name: String, candidates: usize },
}

/// Top-level build errors. Only `InvariantViolation` is fatal (spec §7:
/// "Invariant violations... is the only fatal category").
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("worker pool channel error: {0}")]
    Channel(String),

    #[error(
        "invariant violated: edge {edge_id} in {file_path} references unknown node {missing_id}"
    )]
    InvariantViolation {
        edge_id: Id,
        file_path: PathBuf,
        missing_id: Id,
    },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

pub type SourceResult<T> = Result<T, SourceError>;
pub type CacheResult<T> = Result<T, CacheError>;
pub type BuildResult<T> = Result<T, BuildError>;

/// A non-fatal parse issue, carried in the `IRDocument` rather than
/// propagated as an error (spec §7 "Parse errors").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ParseIssue {
    pub span: crate::types::Span,
    pub message: String,
}

/// A non-fatal per-function layer failure (spec §7 "Lower errors",
/// "Semantic layer errors").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunctionFailure {
    pub function_fqn: Box<str>,
    pub layer: Box<str>,
    pub reason: Box<str>,
}
