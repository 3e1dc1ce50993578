use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::VersionRecord;
use crate::error::QueryError;
use crate::utils::config::HttpConsts;

use super::http::{build_client, get_json};
use super::{PackageMetadata, VersionSource};

/// deps.dev v3 package endpoint: `GET /v3/systems/{system}/packages/{name}`.
pub struct DepsDev {
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct PackageResponse {
    #[serde(default)]
    versions: Vec<VersionEntry>,
}

#[derive(Deserialize)]
struct VersionEntry {
    #[serde(rename = "versionKey")]
    version_key: VersionKey,
    #[serde(rename = "publishedAt", default)]
    published_at: Option<String>,
}

#[derive(Deserialize)]
struct VersionKey {
    version: String,
}

impl DepsDev {
    pub fn new() -> Result<Self> {
        Self::with_base_url(HttpConsts::DEPS_DEV_URL)
    }

    /// `base_url` is the `.../v3/systems` prefix.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: Url::parse(base_url)
                .with_context(|| format!("invalid deps.dev url {base_url}"))?,
        })
    }

    /// Name and system are path segments, so `g:a` and scoped npm names are escaped.
    pub fn package_url(&self, system: &str, name: &str) -> Result<Url, QueryError> {
        let invalid = |reason: &str| QueryError::InvalidQuery {
            query: format!("{system}/{name}"),
            reason: reason.to_string(),
        };
        if system.is_empty() || name.is_empty() {
            return Err(invalid("system and name are required"));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| invalid("base url cannot carry a path"))?
            .pop_if_empty()
            .extend([system, "packages", name]);
        Ok(url)
    }
}

impl VersionSource for DepsDev {
    fn versions(&self, system: &str, name: &str) -> Result<PackageMetadata, QueryError> {
        let resp: PackageResponse = get_json(&self.client, self.package_url(system, name)?)?;
        let versions = resp
            .versions
            .into_iter()
            .map(|v| VersionRecord {
                version: v.version_key.version,
                release_timestamp: v.published_at.filter(|t| !t.is_empty()),
            })
            .collect();
        Ok(PackageMetadata {
            name: name.to_string(),
            system: system.to_string(),
            versions,
        })
    }
}
