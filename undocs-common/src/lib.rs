//! # UNDOCS Common Library
//!
//! Shared code for the UNDOCS crates:
//! - Error type and result alias
//! - Bootstrap configuration loading
//! - Symbol classification and reference extraction
//! - Document records and the on-disk collection
//! - Atomic file writes

pub mod config;
pub mod error;
pub mod models;
pub mod persist;
pub mod symbols;

pub use error::{Error, Result};
pub use models::{DocumentCollection, DocumentRecord, LinkMethod};
pub use symbols::{extract_symbol_references, is_proposal, is_resolution, SymbolKind};
