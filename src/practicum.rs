use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::Config;

pub const PRACTICUM_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("grading API is unreachable: {reason}")]
    Unreachable { reason: String },
    #[error("grading API answered with status {code}")]
    BadStatus { code: u16 },
    #[error("grading API response is not valid JSON: {reason}")]
    Undecodable { reason: String },
}

/// Anything that can return the raw homework-statuses payload changed since
/// `from_date` (Unix seconds). One call is one request; no retries.
#[async_trait]
pub trait HomeworkApi: Send + Sync {
    async fn fetch(&self, from_date: i64) -> Result<Value, FetchError>;
}

#[derive(Clone)]
pub struct PracticumClient {
    http: Client,
    endpoint: Url,
    token: String,
}

impl fmt::Debug for PracticumClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticumClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl PracticumClient {
    pub fn new(token: String, endpoint: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("hw-watchbot/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let endpoint = Url::parse(&cfg.practicum.endpoint)
            .with_context(|| format!("invalid practicum.endpoint {}", cfg.practicum.endpoint))?;
        Self::new(
            cfg.practicum.token.clone(),
            endpoint,
            Duration::from_secs(cfg.practicum.timeout_secs),
        )
    }

    pub fn build_request(&self, from_date: i64) -> Result<reqwest::Request> {
        self.http
            .get(self.endpoint.clone())
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .build()
            .context("failed to build homework statuses request")
    }
}

#[async_trait]
impl HomeworkApi for PracticumClient {
    #[instrument(skip(self))]
    async fn fetch(&self, from_date: i64) -> Result<Value, FetchError> {
        let request = self
            .build_request(from_date)
            .map_err(|err| FetchError::Unreachable {
                reason: format!("{err:#}"),
            })?;
        debug!(url = %request.url(), "requesting homework statuses");

        let res = self
            .http
            .execute(request)
            .await
            .map_err(|err| FetchError::Unreachable {
                reason: err.without_url().to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, body = %body, "grading API returned an error status");
            return Err(FetchError::BadStatus {
                code: status.as_u16(),
            });
        }

        let bytes = res.bytes().await.map_err(|err| FetchError::Unreachable {
            reason: err.without_url().to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|err| FetchError::Undecodable {
            reason: err.to_string(),
        })
    }
}
