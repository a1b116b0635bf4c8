//! undocs-sync library interface
//!
//! Discovers new documents in the UN document repository by probing
//! generated symbols, and links adopted resolutions to their draft
//! proposals. The `undocs` binary wires these together; integration tests
//! drive them with synthetic services.

pub mod discovery;
pub mod generator;
pub mod lineage;
pub mod patterns;
pub mod services;
pub mod state;

pub use discovery::{DiscoverySync, PatternSyncResult, SyncOptions, SyncReport};
pub use generator::{batches, generate, SymbolBatch};
pub use lineage::{LineageResolver, LinkStats, ResolverOptions};
pub use patterns::{load_patterns, parse_patterns, Pattern, Variable};
pub use state::{SyncState, SyncStateStore};

/// File name of the pattern definitions inside the config directory
pub const PATTERNS_FILE_NAME: &str = "patterns.yaml";
