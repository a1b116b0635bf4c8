//! Document records shared by the lineage resolver and downstream readers

use crate::persist::write_atomic;
use crate::symbols::{extract_symbol_references, normalize_symbol, SymbolKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// How a resolution/proposal link was established
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMethod {
    #[default]
    None,
    /// Authoritative bibliographic metadata
    UndlMetadata,
    /// Draft symbol cited in the resolution text
    SymbolReference,
    /// Fuzzy title match against local proposals
    TitleSimilarity,
}

impl LinkMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMethod::None => "none",
            LinkMethod::UndlMetadata => "undl_metadata",
            LinkMethod::SymbolReference => "symbol_reference",
            LinkMethod::TitleSimilarity => "title_similarity",
        }
    }
}

/// One ingested document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub symbol: String,
    #[serde(default)]
    pub title: String,
    /// Draft symbols mentioned in the body, first-appearance order
    #[serde(default)]
    pub symbol_references: Vec<String>,

    #[serde(default)]
    pub link_method: LinkMethod,
    /// 0.0 when unlinked
    #[serde(default)]
    pub link_confidence: f32,
    #[serde(default)]
    pub base_proposal_symbol: Option<String>,
    /// Local proposals that produced this resolution (ordered, no duplicates)
    #[serde(default)]
    pub linked_proposal_symbols: Vec<String>,
    /// Set on proposals once a resolution links to them
    #[serde(default)]
    pub linked_resolution_symbol: Option<String>,
}

impl DocumentRecord {
    pub fn new(symbol: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Build a record from extracted body text.
    ///
    /// The record's own symbol is never listed among its references.
    pub fn from_text(symbol: impl Into<String>, title: impl Into<String>, text: &str) -> Self {
        let mut record = Self::new(symbol, title);
        let own = normalize_symbol(&record.symbol);
        record.symbol_references = extract_symbol_references(text)
            .into_iter()
            .filter(|s| *s != own)
            .collect();
        record
    }

    pub fn with_references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbol_references = references.into_iter().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> SymbolKind {
        SymbolKind::of(&self.symbol)
    }

    /// True once any pass has recorded lineage for this resolution
    pub fn is_linked(&self) -> bool {
        !self.linked_proposal_symbols.is_empty() || self.base_proposal_symbol.is_some()
    }

    /// Add a proposal to the linked set, keeping insertion order
    pub fn add_linked_proposal(&mut self, symbol: &str) {
        if !self.linked_proposal_symbols.iter().any(|s| s == symbol) {
            self.linked_proposal_symbols.push(symbol.to_string());
        }
    }
}

/// File name of the document collection inside the data directory
pub const DOCUMENTS_FILE_NAME: &str = "documents.json";

/// On-disk document collection (`documents.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentCollection {
    pub documents: Vec<DocumentRecord>,
}

impl DocumentCollection {
    pub fn new(documents: Vec<DocumentRecord>) -> Self {
        Self { documents }
    }

    /// Load a collection; a missing file is an empty collection
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let collection: DocumentCollection = serde_json::from_str(&content)?;
        Ok(collection)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &json)
    }

    /// Map of normalized symbol to position in `documents`
    pub fn index(&self) -> HashMap<String, usize> {
        index_by_symbol(&self.documents)
    }

    pub fn get(&self, symbol: &str) -> Option<&DocumentRecord> {
        let key = normalize_symbol(symbol);
        self.documents
            .iter()
            .find(|d| normalize_symbol(&d.symbol) == key)
    }

    /// Reject collections where two records share a symbol
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashMap::new();
        for (i, doc) in self.documents.iter().enumerate() {
            if let Some(prev) = seen.insert(normalize_symbol(&doc.symbol), i) {
                return Err(Error::InvalidInput(format!(
                    "duplicate symbol {} (records {} and {})",
                    doc.symbol, prev, i
                )));
            }
        }
        Ok(())
    }
}

/// Index records by normalized symbol; the first occurrence wins
pub fn index_by_symbol(documents: &[DocumentRecord]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(documents.len());
    for (i, doc) in documents.iter().enumerate() {
        index.entry(normalize_symbol(&doc.symbol)).or_insert(i);
    }
    index
}
