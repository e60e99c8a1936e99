use crate::model::{EpisodeList, Serie};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;

/// Upstream API unreachable or unparsable. Recoverable everywhere: broadcast
/// skips the subscriber, interactive paths reply with a generic failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("invalid request url: {0}")]
    Url(String),
}

/// Read-only view of the upstream episode API. The bot consumes this seam so
/// tests can substitute a scripted fake.
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    /// Daily airing listing, optionally filtered to one tracked subject.
    async fn daily(&self, subject: Option<&str>) -> Result<EpisodeList, FetchError>;

    /// Episodes whose serie matches `query`.
    async fn search(&self, query: &str) -> Result<EpisodeList, FetchError>;

    /// Detail record for a single serie.
    async fn serie(&self, id: i64) -> Result<Serie, FetchError>;
}

#[derive(Clone)]
pub struct UpstreamClient {
    http: Client,
    base_url: Url,
    credential: String,
}

impl fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    pub fn new(base_url: Url, credential: String) -> Self {
        let http = Client::builder()
            .user_agent("tg-airwatch/0.1")
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            credential,
        }
    }

    /// GET request for `path` relative to the base URL, carrying the Basic
    /// authorization header the upstream expects (base64 of the raw
    /// credential string).
    pub fn build_request(&self, path: &str) -> Result<reqwest::Request, FetchError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| FetchError::Url(err.to_string()))?;
        self.http
            .get(url)
            .header(
                "Authorization",
                format!("Basic {}", BASE64.encode(&self.credential)),
            )
            .build()
            .map_err(FetchError::Transport)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let request = self.build_request(path)?;
        let res = self.http.execute(request).await?;
        if !res.status().is_success() {
            return Err(FetchError::Status(res.status()));
        }
        Ok(res.json::<T>().await?)
    }
}

#[async_trait]
impl EpisodeSource for UpstreamClient {
    async fn daily(&self, subject: Option<&str>) -> Result<EpisodeList, FetchError> {
        let path = match subject {
            Some(subject) => format!("daily/{subject}"),
            None => "daily/".to_string(),
        };
        self.get_json(&path).await
    }

    async fn search(&self, query: &str) -> Result<EpisodeList, FetchError> {
        self.get_json(&format!("search/{query}")).await
    }

    async fn serie(&self, id: i64) -> Result<Serie, FetchError> {
        self.get_json(&format!("serie/{id}")).await
    }
}
