//! Symbol-space discovery
//!
//! The repository cannot be listed, so each series is probed: starting one
//! past the last confirmed sequence number, every candidate symbol is
//! checked, found documents are downloaded, and the scan stops after
//! `max_consecutive_misses` sequence numbers in a row without a hit.
//!
//! Probing is strictly sequential; the stopping rule depends on the order
//! of outcomes.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use undocs_common::config::DiscoveryConfig;
use undocs_common::{Error, Result};

use crate::generator::batches;
use crate::patterns::Pattern;
use crate::services::{DocumentFetcher, ExistenceProbe};
use crate::state::{SyncState, SyncStateStore};

/// Directory (under the data dir) holding downloaded PDFs
pub const PDF_DIR_NAME: &str = "pdfs";

/// Discovery settings
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Consecutive sequence numbers without any hit that end a scan
    pub max_consecutive_misses: u32,
    pub language: String,
    /// Persist state after each pattern rather than once per run
    pub commit_each_pattern: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_consecutive_misses: 3,
            language: "en".to_string(),
            commit_each_pattern: false,
        }
    }
}

impl From<&DiscoveryConfig> for SyncOptions {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            max_consecutive_misses: config.max_consecutive_misses,
            language: config.language.clone(),
            commit_each_pattern: config.commit_each_pattern,
        }
    }
}

/// Outcome of scanning one pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternSyncResult {
    pub pattern: String,
    /// Newly materialized symbols, in probe order
    pub new_symbols: Vec<String>,
    /// Highest confirmed sequence number after this scan
    pub highest_found: Option<u64>,
    /// Sequence number the scan resumed at
    pub resumed_at: u64,
    /// Existence checks issued
    pub probes: usize,
}

/// Outcome of a full sync run
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub results: Vec<PatternSyncResult>,
    pub last_sync: DateTime<Utc>,
}

impl SyncReport {
    pub fn total_new(&self) -> usize {
        self.results.iter().map(|r| r.new_symbols.len()).sum()
    }
}

/// Drives generation, probing and retrieval across patterns
pub struct DiscoverySync {
    probe: Arc<dyn ExistenceProbe>,
    fetcher: Arc<dyn DocumentFetcher>,
    data_dir: PathBuf,
    options: SyncOptions,
}

impl DiscoverySync {
    pub fn new(
        probe: Arc<dyn ExistenceProbe>,
        fetcher: Arc<dyn DocumentFetcher>,
        data_dir: impl Into<PathBuf>,
        options: SyncOptions,
    ) -> Self {
        Self {
            probe,
            fetcher,
            data_dir: data_dir.into(),
            options,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// `<data_dir>/pdfs/<pattern directory name>`
    pub fn pattern_dir(&self, pattern: &Pattern) -> PathBuf {
        self.data_dir.join(PDF_DIR_NAME).join(pattern.directory_name())
    }

    /// Scan one pattern from its resume point until the miss threshold.
    ///
    /// `state` is only read; the caller records the result.
    pub async fn sync_pattern(
        &self,
        pattern: &Pattern,
        state: &SyncState,
    ) -> Result<PatternSyncResult> {
        let resumed_at = state.resume_number(pattern);
        let output_dir = self.pattern_dir(pattern);
        tokio::fs::create_dir_all(&output_dir).await?;

        let max_misses = self.options.max_consecutive_misses.max(1);
        let mut highest_found = state.highest_found(pattern.name());
        let mut new_symbols = Vec::new();
        let mut consecutive_misses = 0u32;
        let mut probes = 0usize;

        info!(
            pattern = %pattern.name(),
            resume_at = resumed_at,
            "Scanning pattern"
        );

        let resumed = pattern.with_start(resumed_at);
        for batch in batches(&resumed) {
            let mut hit = false;

            for symbol in &batch.symbols {
                probes += 1;
                if !self.probe.exists(symbol, &self.options.language).await {
                    debug!(symbol = %symbol, "Not found");
                    continue;
                }

                if self.materialize(symbol, &output_dir).await? {
                    new_symbols.push(symbol.clone());
                    hit = true;
                }
            }

            if hit {
                consecutive_misses = 0;
                highest_found = Some(batch.number);
            } else {
                consecutive_misses += 1;
                if consecutive_misses >= max_misses {
                    debug!(
                        pattern = %pattern.name(),
                        number = batch.number,
                        misses = consecutive_misses,
                        "Miss threshold reached"
                    );
                    break;
                }
            }
        }

        info!(
            pattern = %pattern.name(),
            new = new_symbols.len(),
            highest_found = ?highest_found,
            probes = probes,
            "Pattern scan complete"
        );

        Ok(PatternSyncResult {
            pattern: pattern.name().to_string(),
            new_symbols,
            highest_found,
            resumed_at,
            probes,
        })
    }

    /// Download a found document. A retrieval failure is logged and treated
    /// as a miss; a local write failure aborts the run.
    async fn materialize(&self, symbol: &str, output_dir: &Path) -> Result<bool> {
        match self
            .fetcher
            .fetch(symbol, &self.options.language, output_dir)
            .await
        {
            Ok(path) => {
                info!(symbol = %symbol, path = %path.display(), "Downloaded document");
                Ok(true)
            }
            Err(Error::Network(reason)) => {
                warn!(symbol = %symbol, reason = %reason, "Download failed, counting as miss");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Sync every pattern and persist the merged state.
    ///
    /// Nothing is reported unless the state write succeeds.
    pub async fn sync_all(
        &self,
        patterns: &[Pattern],
        store: &SyncStateStore,
    ) -> Result<SyncReport> {
        let mut state = store.load()?;
        let mut results = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let result = self.sync_pattern(pattern, &state).await?;
            state.record(pattern.name(), result.highest_found);

            if self.options.commit_each_pattern {
                state.last_sync = Some(Utc::now());
                store.save(&state)?;
            }
            results.push(result);
        }

        let last_sync = Utc::now();
        state.last_sync = Some(last_sync);
        store.save(&state)?;

        Ok(SyncReport { results, last_sync })
    }
}
