//! Test Helper Utilities
//!
//! Synthetic repository and metadata services that record every call, so
//! tests can assert exactly which symbols were probed or fetched.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use undocs_common::{Error, Result};
use undocs_sync::services::{
    document_file_name, DocumentFetcher, ExistenceProbe, MetadataClient, UndlMetadata,
};
use undocs_sync::{Pattern, Variable};

/// Probe answering from a fixed set of existing symbols
#[derive(Default)]
pub struct ScriptedProbe {
    existing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            existing: existing.into_iter().map(Into::into).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Symbols probed so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExistenceProbe for ScriptedProbe {
    async fn exists(&self, symbol: &str, _language: &str) -> bool {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.existing.contains(symbol)
    }
}

/// How a [`RecordingFetcher`] responds to a symbol
#[derive(Debug, Clone, Copy)]
pub enum FetchFailure {
    Network,
    Io,
}

/// Fetcher writing a small placeholder PDF for each symbol
#[derive(Default)]
pub struct RecordingFetcher {
    failures: HashMap<String, FetchFailure>,
    calls: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, symbol: &str, failure: FetchFailure) -> Self {
        self.failures.insert(symbol.to_string(), failure);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for RecordingFetcher {
    async fn fetch(&self, symbol: &str, _language: &str, output_dir: &Path) -> Result<PathBuf> {
        self.calls.lock().unwrap().push(symbol.to_string());

        match self.failures.get(symbol) {
            Some(FetchFailure::Network) => {
                return Err(Error::Network(format!("GET {} returned 503", symbol)))
            }
            Some(FetchFailure::Io) => {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only filesystem",
                )))
            }
            None => {}
        }

        let path = output_dir.join(document_file_name(symbol));
        std::fs::write(&path, b"%PDF-1.7\n")?;
        Ok(path)
    }
}

/// Metadata client serving canned records
#[derive(Default)]
pub struct StaticMetadataClient {
    records: HashMap<String, UndlMetadata>,
    calls: Mutex<Vec<String>>,
}

impl StaticMetadataClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record whose cross references are `related`
    pub fn with_record(mut self, symbol: &str, related: &[&str]) -> Self {
        let related_symbols: Vec<String> = related.iter().map(|s| s.to_string()).collect();
        let draft_symbols: Vec<String> = related_symbols
            .iter()
            .filter(|s| undocs_common::is_proposal(s))
            .cloned()
            .collect();
        self.records.insert(
            symbol.to_string(),
            UndlMetadata {
                symbol: symbol.to_string(),
                base_proposal: draft_symbols.first().cloned(),
                related_symbols,
                draft_symbols,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataClient for StaticMetadataClient {
    async fn fetch(&self, symbol: &str) -> Option<UndlMetadata> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.records.get(symbol).cloned()
    }
}

/// Pattern with scalar variables only
pub fn simple_pattern(name: &str, template: &str, start: u64, scalars: &[(&str, &str)]) -> Pattern {
    let variables = scalars
        .iter()
        .map(|(k, v)| (k.to_string(), Variable::scalar(v)))
        .collect();
    Pattern::from_parts(name, template, start, variables).unwrap()
}
