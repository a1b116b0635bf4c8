//! UN Digital Library (UNDL) bibliographic metadata client
//!
//! Fetches the MARC-XML record for a symbol and extracts its cross
//! references. Relevant fields:
//! - tag `191` `$a`: the record's own symbol
//! - tag `993` `$a`: related symbols (drafts, meeting records, reports);
//!   the first indicator tells the kinds apart, drafts are recognized by
//!   their symbol shape
//!
//! Metadata absence is a normal outcome: network failures, non-success
//! statuses and malformed XML all yield `None`.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use undocs_common::symbols::{is_proposal, normalize_symbol};

use crate::services::USER_AGENT;

const SELF_REFERENCE_TAG: &str = "191";
const CROSS_REFERENCE_TAG: &str = "993";

/// Normalized bibliographic record for one symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndlMetadata {
    /// Symbol as queried
    pub symbol: String,
    /// Every cross-referenced symbol, document order, deduplicated
    pub related_symbols: Vec<String>,
    /// Draft proposals among `related_symbols`, document order
    pub draft_symbols: Vec<String>,
    /// First draft, if any
    pub base_proposal: Option<String>,
}

/// Bibliographic metadata capability consumed by the lineage resolver
#[async_trait]
pub trait MetadataClient: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Option<UndlMetadata>;
}

/// UNDL client errors (internal, folded into `None`)
#[derive(Debug, Error)]
pub enum UndlError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}")]
    ApiError(u16),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

fn subfield<'a>(datafield: roxmltree::Node<'a, '_>, code: &str) -> Option<&'a str> {
    datafield
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "subfield")
        .find(|n| n.attribute("code") == Some(code))
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn datafields<'a, 'input>(
    record: roxmltree::Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    record
        .children()
        .filter(move |n| {
            n.is_element() && n.tag_name().name() == "datafield" && n.attribute("tag") == Some(tag)
        })
}

/// Parse a MARC-XML response and return the record describing `symbol`.
///
/// The self-reference match is case-insensitive. Returns `None` for
/// malformed XML or when no record matches.
pub fn parse_marc_xml(xml: &str, symbol: &str) -> Option<UndlMetadata> {
    let doc = match roxmltree::Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(symbol = %symbol, error = %e, "Malformed MARC-XML");
            return None;
        }
    };
    let target = normalize_symbol(symbol);

    let record = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "record")
        .find(|record| {
            datafields(*record, SELF_REFERENCE_TAG)
                .filter_map(|df| subfield(df, "a"))
                .any(|s| normalize_symbol(s) == target)
        })?;

    let mut seen = HashSet::new();
    let related_symbols: Vec<String> = datafields(record, CROSS_REFERENCE_TAG)
        .filter_map(|df| subfield(df, "a"))
        .filter(|s| seen.insert(normalize_symbol(s)))
        .map(str::to_string)
        .collect();

    let draft_symbols: Vec<String> = related_symbols
        .iter()
        .filter(|s| is_proposal(s))
        .cloned()
        .collect();

    Some(UndlMetadata {
        symbol: symbol.to_string(),
        base_proposal: draft_symbols.first().cloned(),
        related_symbols,
        draft_symbols,
    })
}

/// Minimum spacing between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("UNDL rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// UNDL search API client
pub struct UndlClient {
    http_client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl UndlClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        rate_limit_ms: u64,
    ) -> Result<Self, UndlError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UndlError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
            rate_limiter: Arc::new(RateLimiter::new(rate_limit_ms)),
        })
    }

    /// Search URL selecting records whose 191 `$a` equals `symbol`, as MARC-XML
    pub fn record_url(&self, symbol: &str) -> Result<Url, UndlError> {
        let query = format!("191__a:\"{}\"", symbol);
        Url::parse_with_params(&self.base_url, &[("p", query.as_str()), ("of", "xm")])
            .map_err(|e| UndlError::InvalidUrl(e.to_string()))
    }

    async fn fetch_record_xml(&self, symbol: &str) -> Result<String, UndlError> {
        self.rate_limiter.wait().await;

        let url = self.record_url(symbol)?;
        debug!(symbol = %symbol, url = %url, "Querying UNDL");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| UndlError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UndlError::ApiError(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| UndlError::NetworkError(e.to_string()))
    }
}

#[async_trait]
impl MetadataClient for UndlClient {
    async fn fetch(&self, symbol: &str) -> Option<UndlMetadata> {
        let xml = match self.fetch_record_xml(symbol).await {
            Ok(xml) => xml,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "UNDL lookup failed");
                return None;
            }
        };

        let metadata = parse_marc_xml(&xml, symbol);
        match &metadata {
            Some(m) => info!(
                symbol = %symbol,
                related = m.related_symbols.len(),
                base_proposal = ?m.base_proposal,
                "Retrieved UNDL metadata"
            ),
            None => debug!(symbol = %symbol, "No matching UNDL record"),
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MARC_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection xmlns="http://www.loc.gov/MARC21/slim">
  <record>
    <datafield tag="191" ind1=" " ind2=" ">
      <subfield code="a">A/RES/80/142</subfield>
      <subfield code="b">A/</subfield>
      <subfield code="c">80</subfield>
    </datafield>
    <datafield tag="993" ind1="2" ind2=" ">
      <subfield code="a">A/C.2/80/L.35/Rev.1</subfield>
    </datafield>
    <datafield tag="993" ind1="4" ind2=" ">
      <subfield code="a">A/80/PV.64</subfield>
    </datafield>
    <datafield tag="993" ind1="2" ind2=" ">
      <subfield code="a">A/80/555</subfield>
    </datafield>
  </record>
</collection>
"#;

    const NO_DRAFT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection xmlns="http://www.loc.gov/MARC21/slim">
  <record>
    <datafield tag="191" ind1=" " ind2=" ">
      <subfield code="a">A/RES/80/166</subfield>
    </datafield>
    <datafield tag="993" ind1="4" ind2=" ">
      <subfield code="a">A/80/PV.70</subfield>
    </datafield>
  </record>
</collection>
"#;

    const MULTIPLE_DRAFTS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<collection xmlns="http://www.loc.gov/MARC21/slim">
  <record>
    <datafield tag="191" ind1=" " ind2=" ">
      <subfield code="a">A/RES/80/99</subfield>
    </datafield>
    <datafield tag="993" ind1="2" ind2=" ">
      <subfield code="a">A/80/L.49</subfield>
    </datafield>
  </record>
  <record>
    <datafield tag="191" ind1=" " ind2=" ">
      <subfield code="a">A/RES/80/100</subfield>
    </datafield>
    <datafield tag="993" ind1="2" ind2=" ">
      <subfield code="a">A/80/L.50</subfield>
    </datafield>
    <datafield tag="993" ind1="2" ind2=" ">
      <subfield code="a">A/80/L.51</subfield>
    </datafield>
    <datafield tag="993" ind1="2" ind2=" ">
      <subfield code="a">A/80/L.50</subfield>
    </datafield>
  </record>
</collection>
"#;

    #[test]
    fn test_parse_resolution_with_draft() {
        let result = parse_marc_xml(SAMPLE_MARC_XML, "A/RES/80/142").unwrap();

        assert_eq!(result.symbol, "A/RES/80/142");
        assert_eq!(
            result.related_symbols,
            vec!["A/C.2/80/L.35/Rev.1", "A/80/PV.64", "A/80/555"]
        );
        assert_eq!(result.draft_symbols, vec!["A/C.2/80/L.35/Rev.1"]);
        assert_eq!(result.base_proposal.as_deref(), Some("A/C.2/80/L.35/Rev.1"));
    }

    #[test]
    fn test_parse_resolution_no_draft() {
        let result = parse_marc_xml(NO_DRAFT_XML, "A/RES/80/166").unwrap();

        assert_eq!(result.related_symbols, vec!["A/80/PV.70"]);
        assert!(result.draft_symbols.is_empty());
        assert!(result.base_proposal.is_none());
    }

    #[test]
    fn test_parse_selects_matching_record_and_dedups() {
        let result = parse_marc_xml(MULTIPLE_DRAFTS_XML, "A/RES/80/100").unwrap();

        assert_eq!(result.draft_symbols, vec!["A/80/L.50", "A/80/L.51"]);
        assert_eq!(result.base_proposal.as_deref(), Some("A/80/L.50"));
    }

    #[test]
    fn test_parse_symbol_not_found() {
        assert!(parse_marc_xml(SAMPLE_MARC_XML, "A/RES/99/999").is_none());
    }

    #[test]
    fn test_parse_invalid_xml() {
        assert!(parse_marc_xml("<invalid>not xml", "A/RES/80/142").is_none());
        assert!(parse_marc_xml("", "A/RES/80/142").is_none());
    }

    #[test]
    fn test_parse_empty_collection() {
        let empty = r#"<?xml version="1.0"?>
        <collection xmlns="http://www.loc.gov/MARC21/slim">
        </collection>
        "#;
        assert!(parse_marc_xml(empty, "A/RES/80/142").is_none());
    }

    #[test]
    fn test_parse_case_insensitive_symbol_match() {
        let lower = SAMPLE_MARC_XML.replace("A/RES/80/142", "a/res/80/142");

        let result = parse_marc_xml(&lower, "A/RES/80/142").unwrap();
        assert_eq!(result.symbol, "A/RES/80/142");

        let result = parse_marc_xml(SAMPLE_MARC_XML, "a/res/80/142").unwrap();
        assert_eq!(result.symbol, "a/res/80/142");
    }

    #[test]
    fn test_record_url() {
        let client = UndlClient::new(
            "https://digitallibrary.un.org/search",
            Duration::from_secs(5),
            0,
        )
        .unwrap();
        let url = client.record_url("A/RES/80/142").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("p".to_string(), "191__a:\"A/RES/80/142\"".to_string()),
                ("of".to_string(), "xm".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(200);

        let start = Instant::now();
        limiter.wait().await;
        let first_elapsed = start.elapsed();
        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(180));
    }
}
