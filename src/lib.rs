//! sbomflow: bounded concurrent pipelines for SBOM and package-registry metadata.
//!
//! The core is [`pipeline::Dispatcher`] (producer → worker pool → batched collector) and its
//! fan-out variant [`classify::ClassifyingCache`]. [`version::version_distance`] is the
//! version-lag calculation the CLI runs inside them.

pub mod classify;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod sbom;
pub mod source;
pub mod store;
pub mod types;
pub mod utils;
pub mod version;

/// Re-export types for API
pub use types::*;

pub use error::{ConfigError, ParseError, PersistenceError, PipelineError, QueryError};
pub use pipeline::{BatchSize, DispatchConfig, DispatchStats, Dispatcher};
pub use version::{parse_relaxed, version_distance};

/// Result alias used by the application-level API (CLI handlers, store setup).
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
