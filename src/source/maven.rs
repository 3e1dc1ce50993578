use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::error::QueryError;
use crate::utils::config::HttpConsts;

use super::http::{build_client, get_json};
use super::{MetadataSource, SearchResponse};

/// Maven Central artifact search (`q=a:<name>`).
pub struct MavenCentral {
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct SolrEnvelope {
    response: SearchResponse,
}

impl MavenCentral {
    pub fn new() -> Result<Self> {
        Self::with_base_url(HttpConsts::MAVEN_SEARCH_URL)
    }

    /// Point at another Solr select endpoint (mirrors, local stubs).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: Url::parse(base_url)
                .with_context(|| format!("invalid search url {base_url}"))?,
        })
    }

    pub fn search_url(&self, name: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("a:{name}"))
            .append_pair("rows", &HttpConsts::MAVEN_SEARCH_ROWS.to_string())
            .append_pair("wt", "json");
        url
    }
}

impl MetadataSource for MavenCentral {
    fn query(&self, name: &str) -> Result<SearchResponse, QueryError> {
        if name.trim().is_empty() {
            return Err(QueryError::InvalidQuery {
                query: name.to_string(),
                reason: "empty artifact name".to_string(),
            });
        }
        let envelope: SolrEnvelope = get_json(&self.client, self.search_url(name))?;
        Ok(envelope.response)
    }
}
