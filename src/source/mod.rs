//! External metadata sources: Maven Central search and deps.dev package versions.

mod deps_dev;
mod http;
mod maven;

pub use deps_dev::DepsDev;
pub use maven::MavenCentral;

use serde::{Deserialize, Serialize};

use crate::VersionRecord;
use crate::error::QueryError;

/// Maven Central search result (the `response` object of a Solr select).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "numFound", default)]
    pub num_found: i64,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub docs: Vec<SearchDoc>,
}

/// One artifact in a [`SearchResponse`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDoc {
    pub id: String,
    #[serde(rename = "g")]
    pub group: String,
    #[serde(rename = "a")]
    pub artifact: String,
    #[serde(rename = "latestVersion")]
    pub latest_version: String,
    #[serde(rename = "repositoryId")]
    pub repository_id: String,
    #[serde(rename = "p")]
    pub packaging: String,
    pub timestamp: i64,
    #[serde(rename = "versionCount")]
    pub version_count: i64,
}

/// Every published version of one package, as stored by `import`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    pub system: String,
    pub versions: Vec<VersionRecord>,
}

/// Name search against a package index. Shared by reference across workers.
pub trait MetadataSource: Sync {
    fn query(&self, name: &str) -> Result<SearchResponse, QueryError>;
}

/// Version listing for a package in a given ecosystem (`MAVEN`, `NPM`, ...).
pub trait VersionSource: Sync {
    fn versions(&self, system: &str, name: &str) -> Result<PackageMetadata, QueryError>;
}

impl<S: MetadataSource + ?Sized> MetadataSource for &S {
    fn query(&self, name: &str) -> Result<SearchResponse, QueryError> {
        (**self).query(name)
    }
}

impl<S: VersionSource + ?Sized> VersionSource for &S {
    fn versions(&self, system: &str, name: &str) -> Result<PackageMetadata, QueryError> {
        (**self).versions(system, name)
    }
}
