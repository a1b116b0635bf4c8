//! Persisted sync progress
//!
//! `state.json` records, per pattern, the highest sequence number confirmed
//! to exist and the time of the last completed sync:
//!
//! ```json
//! {
//!   "version": 1,
//!   "patterns": { "General Assembly Resolutions": { "highest_found": 142 } },
//!   "last_sync": "2025-12-19T08:30:00Z"
//! }
//! ```
//!
//! The file is read once at the start of a run and rewritten wholesale
//! (atomically) at the end.

use crate::patterns::Pattern;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use undocs_common::persist::write_atomic;
use undocs_common::{Error, Result};

/// Current on-disk format version
pub const STATE_VERSION: u32 = 1;

/// File name of the sync state inside the data directory
pub const STATE_FILE_NAME: &str = "state.json";

fn default_version() -> u32 {
    STATE_VERSION
}

/// Progress for one pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_found: Option<u64>,
}

/// Whole-run sync state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub patterns: BTreeMap<String, PatternState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            patterns: BTreeMap::new(),
            last_sync: None,
        }
    }
}

impl SyncState {
    pub fn highest_found(&self, pattern_name: &str) -> Option<u64> {
        self.patterns
            .get(pattern_name)
            .and_then(|p| p.highest_found)
    }

    /// Sequence number a scan of `pattern` resumes at
    pub fn resume_number(&self, pattern: &Pattern) -> u64 {
        match self.highest_found(pattern.name()) {
            Some(highest) => highest.saturating_add(1),
            None => pattern.start(),
        }
    }

    /// Record a scan result. `highest_found` never decreases and is never
    /// cleared once set.
    pub fn record(&mut self, pattern_name: &str, highest_found: Option<u64>) {
        let entry = self.patterns.entry(pattern_name.to_string()).or_default();
        entry.highest_found = match (entry.highest_found, highest_found) {
            (Some(old), Some(new)) => Some(old.max(new)),
            (old, new) => old.or(new),
        };
    }
}

/// Loads and saves [`SyncState`] at a fixed path
#[derive(Debug, Clone)]
pub struct SyncStateStore {
    path: PathBuf,
}

impl SyncStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/state.json`
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state; a missing file is an empty state
    pub fn load(&self) -> Result<SyncState> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No sync state yet, starting fresh");
            return Ok(SyncState::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let state: SyncState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(Error::Config(format!(
                "{} has format version {}, this build understands up to {}",
                self.path.display(),
                state.version,
                STATE_VERSION
            )));
        }

        Ok(state)
    }

    /// Atomically replace the stored state
    pub fn save(&self, state: &SyncState) -> Result<()> {
        let mut state = state.clone();
        state.version = STATE_VERSION;
        let json = serde_json::to_vec_pretty(&state)?;
        write_atomic(&self.path, &json)?;
        tracing::debug!(
            path = %self.path.display(),
            patterns = state.patterns.len(),
            "Sync state saved"
        );
        Ok(())
    }
}
