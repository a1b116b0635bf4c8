//! Document existence probe
//!
//! Answers "does the repository hold a document for this symbol?" with a
//! HEAD request against the symbol access endpoint. Only a success status
//! carrying a PDF content type counts as existing; not-found, other content
//! types, timeouts and connection failures all report `false`. The caller
//! cannot tell "confirmed absent" from "check failed".

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::services::document_fetcher::build_download_url;
use crate::services::USER_AGENT;

/// Existence check capability consumed by discovery
#[async_trait]
pub trait ExistenceProbe: Send + Sync {
    async fn exists(&self, symbol: &str, language: &str) -> bool;
}

/// Internal probe failures, folded into `false` at the trait boundary
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// HTTP existence probe against the document repository
pub struct HttpExistenceProbe {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpExistenceProbe {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProbeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ProbeError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    async fn check(&self, symbol: &str, language: &str) -> Result<bool, ProbeError> {
        let url = build_download_url(&self.base_url, symbol, language)
            .map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;

        let response = self
            .http_client
            .head(url)
            .send()
            .await
            .map_err(|e| ProbeError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            debug!(symbol = %symbol, status = status.as_u16(), "Probe: non-success status");
            return Ok(false);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !content_type.contains("pdf") {
            debug!(symbol = %symbol, content_type = %content_type, "Probe: not a document payload");
            return Ok(false);
        }

        Ok(true)
    }
}

#[async_trait]
impl ExistenceProbe for HttpExistenceProbe {
    async fn exists(&self, symbol: &str, language: &str) -> bool {
        match self.check(symbol, language).await {
            Ok(found) => found,
            Err(e) => {
                debug!(symbol = %symbol, error = %e, "Probe failed, treating as absent");
                false
            }
        }
    }
}
