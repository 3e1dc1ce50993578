//! Error taxonomy for pipeline runs.
//!
//! Per-item failures ([`ParseError`], [`QueryError`], [`PersistenceError`]) travel on the
//! pipeline's error channel as [`PipelineError`] and never stop a run. [`ConfigError`] is the
//! only kind that fails fast, when a dispatcher is built.

use std::path::Path;

/// A version string or input record could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Version string rejected after every relaxed-parsing fallback.
    #[error("version parse error: '{version}': {reason}")]
    Version { version: String, reason: String },

    /// Malformed or incomplete input record (SBOM file, identifier line, ...).
    #[error("record parse error: {source_name}: {reason}")]
    Record { source_name: String, reason: String },

    /// Input could not be read at all.
    #[error("io error: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub fn record(source_name: impl Into<String>, reason: impl ToString) -> Self {
        ParseError::Record {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        ParseError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// External metadata source unavailable, rate limited or returned garbage.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// HTTP 429. Surfaced as-is; nothing retries it.
    #[error("rate limited by {url} (retry after: {hint})", hint = .retry_after.as_deref().unwrap_or("unknown"))]
    RateLimited {
        url: String,
        retry_after: Option<String>,
    },

    #[error("decoding response from {url} failed: {reason}")]
    Decode { url: String, reason: String },

    #[error("invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },
}

/// A store lookup or batch write failed. The batch is not retried.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("store error on '{collection}': {source}")]
    Sqlite {
        collection: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Body could not be encoded for, or decoded from, the collection.
    #[error("json error on '{collection}': {source}")]
    Json {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    /// Export file could not be written.
    #[error("writing {path} failed: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid identifier '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidIdentifier(String),

    #[error("store connection lock poisoned")]
    Poisoned,
}

impl PersistenceError {
    pub(crate) fn sqlite(collection: &str, source: rusqlite::Error) -> Self {
        PersistenceError::Sqlite {
            collection: collection.to_string(),
            source,
        }
    }

    pub(crate) fn json(collection: &str, source: serde_json::Error) -> Self {
        PersistenceError::Json {
            collection: collection.to_string(),
            source,
        }
    }
}

/// Invalid worker / batch / rate-limit configuration. Fatal at startup only.
#[derive(Debug, thiserror::Error)]
#[error("config error: {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl ConfigError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Any per-item failure reported on a pipeline's error channel.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

}

impl PipelineError {
    /// Short label used in drain-side log lines and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Parse(_) => "parse",
            PipelineError::Query(_) => "query",
            PipelineError::Persistence(_) => "persistence",
        }
    }
}
