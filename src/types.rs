//! Public data types shared by the pipeline, the sources and the store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::{BatchSize, DispatchConfig};

/// One published version of a package, as reported by a registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: String,
    /// Registry publish time, verbatim (RFC 3339 for deps.dev). `None` when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_timestamp: Option<String>,
}

impl VersionRecord {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_timestamp: None,
        }
    }
}

impl AsRef<str> for VersionRecord {
    fn as_ref(&self) -> &str {
        &self.version
    }
}

/// How far a used version lags behind the newest known release.
///
/// `missed_releases` counts releases; the segment fields are plain subtraction against the
/// greatest version and go negative when a lower segment of the used version is ahead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDistance {
    pub missed_releases: u64,
    pub missed_major: i64,
    pub missed_minor: i64,
    pub missed_patch: i64,
}

/// A component as the classifying cache sees it: `id` is the cache key, `name` the query.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentRef {
    pub id: String,
    pub name: String,
}

/// One document in the store: lookup key plus JSON body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub body: serde_json::Value,
}

impl Record {
    pub fn new(key: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            body,
        }
    }

    /// Serialize `value` as the body.
    pub fn from_value<T: Serialize>(key: impl Into<String>, value: &T) -> serde_json::Result<Self> {
        Ok(Self {
            key: key.into(),
            body: serde_json::to_value(value)?,
        })
    }
}

/// Effective CLI settings: defaults, then `.sbomflow.toml`, then environment, then flags.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    /// Store path. When None, uses the package db filename in the working directory.
    pub db_path: Option<PathBuf>,
    /// Worker count override. When None, available parallelism.
    pub workers: Option<usize>,
    /// Batch size override. When None, the command's default.
    pub batch_size: Option<usize>,
    /// Producer throttle in milliseconds. When None, the command's default.
    pub rate_limit_ms: Option<u64>,
    pub verbose: bool,
}

impl Settings {
    /// Build a dispatch config, falling back to the command's own batch size and rate limit.
    pub fn dispatch_config(
        &self,
        default_batch: BatchSize,
        default_rate_limit: Option<Duration>,
    ) -> DispatchConfig {
        DispatchConfig {
            workers: self.workers,
            batch_size: self.batch_size.map_or(default_batch, BatchSize::Fixed),
            // 0 switches the throttle off, even for commands that default to one.
            rate_limit: match self.rate_limit_ms {
                Some(0) => None,
                Some(ms) => Some(Duration::from_millis(ms)),
                None => default_rate_limit,
            },
        }
    }
}

/// Version lag of one component of an SBOM.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentDistance {
    pub component_id: String,
    pub name: String,
    pub used_version: String,
    pub distance: VersionDistance,
}

/// Per-SBOM summary written by the `versions` command.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionReport {
    /// Serial number, or the file path when the SBOM has none.
    pub sbom: String,
    pub components: Vec<ComponentDistance>,
    /// Components without a usable package URL, without registry data, or with an
    /// unparsable version.
    pub skipped: usize,
    /// Mean `missed_releases` over `components`; 0 when empty.
    pub average_missed_releases: f64,
}

impl VersionReport {
    pub fn new(
        sbom: impl Into<String>,
        components: Vec<ComponentDistance>,
        skipped: usize,
    ) -> Self {
        let average_missed_releases = if components.is_empty() {
            0.0
        } else {
            components
                .iter()
                .map(|c| c.distance.missed_releases as f64)
                .sum::<f64>()
                / components.len() as f64
        };
        Self {
            sbom: sbom.into(),
            components,
            skipped,
            average_missed_releases,
        }
    }
}
