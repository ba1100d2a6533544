//! Typed errors for the crawler library.
//!
//! Per-account conditions ([`FetchError`]) are kept apart from cycle-fatal
//! conditions ([`CycleError`]) so callers can tell "one account was degraded"
//! from "the crawl state is unusable".

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::store::migration::SchemaVersion;

/// Errors reading, writing, or migrating the score store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("score store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File does not match the canonical schema or contains unparsable values
    #[error("corrupt score store {path}: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    /// File was written by an older schema and must be migrated explicitly
    #[error("score store {path} uses schema {version}, migrate it before crawling")]
    OutdatedSchema {
        path: PathBuf,
        version: SchemaVersion,
    },

    /// CSV encoding failed while writing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptStore {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Why the remote API refused to serve an account's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    NotFound,
    Suspended,
    Unauthorized,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::Suspended => "suspended",
            Self::Unauthorized => "unauthorized",
        };
        f.write_str(s)
    }
}

/// Errors returned by a [`PostFetcher`](crate::traits::fetcher::PostFetcher).
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Expected condition: treated as an empty fetch
    #[error("account unavailable: {0}")]
    Unavailable(UnavailableReason),

    /// Retryable failure that persisted past the fetcher's own retries
    #[error("transient fetch failure: {0}")]
    Transient(String),

    /// The remote quota is gone for this cycle
    #[error("remote API quota exhausted")]
    QuotaExhausted,

    /// Non-retryable failure for this account
    #[error("fetch failed: {0}")]
    Fatal(String),
}

/// Errors appending posts to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("post log I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode post: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid day key: {0}")]
    InvalidDayKey(String),
}

/// Invalid crawl configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("epsilon must be within [0, 1], got {0}")]
    InvalidEpsilon(f64),

    #[error("decay base must be within (0, 1), got {0}")]
    InvalidDecayBase(f64),

    #[error("invalid rate limit: {0}")]
    InvalidQuota(String),
}

/// A post object that lacks the fields the crawler needs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PostParseError {
    #[error("post is missing field `{0}`")]
    MissingField(&'static str),

    #[error("unparsable post timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Cycle-fatal errors. Per-account problems never surface here, and an invalid
/// configuration is rejected earlier by `CrawlScheduler::new` as a [`ConfigError`].
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("score store unusable: {0}")]
    Store(#[from] StoreError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

pub type SinkResult<T> = std::result::Result<T, SinkError>;
