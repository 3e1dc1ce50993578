//! Blocking HTTP plumbing shared by the sources.

use anyhow::{Context, Result};
use log::debug;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::QueryError;
use crate::utils::config::HttpConsts;

/// Client with the request timeout and a package user agent.
pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(HttpConsts::REQUEST_TIMEOUT_SECS))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build HTTP client")
}

/// GET `url` and decode a JSON body. 429 becomes [`QueryError::RateLimited`] carrying the
/// `Retry-After` value; any other non-success status is [`QueryError::Status`]. No retries.
pub(crate) fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T, QueryError> {
    let url_str = url.to_string();
    debug!("GET {}", url_str);
    let resp = client.get(url).send().map_err(|e| QueryError::Transport {
        url: url_str.clone(),
        reason: e.to_string(),
    })?;

    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        debug!("{} rate limited, retry-after {:?}", url_str, retry_after);
        return Err(QueryError::RateLimited {
            url: url_str,
            retry_after,
        });
    }
    if !status.is_success() {
        return Err(QueryError::Status {
            url: url_str,
            status: status.as_u16(),
        });
    }

    resp.json::<T>().map_err(|e| QueryError::Decode {
        url: url_str,
        reason: e.to_string(),
    })
}
