//! Document retrieval
//!
//! Downloads the PDF for a symbol and stores it under the pattern's
//! directory as `<symbol with '/' replaced by '_'>.pdf`.

use async_trait::async_trait;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Duration;
use undocs_common::{Error, Result};

use crate::services::USER_AGENT;

/// Build the symbol access URL: `<base>?s=<symbol>&l=<language>&t=pdf`
pub fn build_download_url(base_url: &str, symbol: &str, language: &str) -> Result<Url> {
    Url::parse_with_params(base_url, &[("s", symbol), ("l", language), ("t", "pdf")])
        .map_err(|e| Error::Config(format!("Invalid documents URL '{}': {}", base_url, e)))
}

/// Deterministic file name for a symbol
pub fn document_file_name(symbol: &str) -> String {
    format!("{}.pdf", symbol.replace('/', "_"))
}

/// Retrieves and persists documents found by discovery.
///
/// Implementations report transport and status failures as
/// [`Error::Network`] and local write failures as [`Error::Io`].
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, symbol: &str, language: &str, output_dir: &Path) -> Result<PathBuf>;
}

/// HTTP document fetcher (follows redirects to the PDF)
pub struct HttpDocumentFetcher {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, symbol: &str, language: &str, output_dir: &Path) -> Result<PathBuf> {
        let url = build_download_url(&self.base_url, symbol, language)?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("GET {} failed: {}", symbol, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "GET {} returned {}",
                symbol,
                status.as_u16()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Reading {} failed: {}", symbol, e)))?;

        let output_path = output_dir.join(document_file_name(symbol));
        tokio::fs::write(&output_path, &bytes).await?;

        tracing::debug!(
            symbol = %symbol,
            path = %output_path.display(),
            bytes = bytes.len(),
            "Document saved"
        );

        Ok(output_path)
    }
}
