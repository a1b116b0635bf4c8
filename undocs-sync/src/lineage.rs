//! Resolution → proposal lineage
//!
//! Each resolution is linked to the draft(s) it was adopted from by the
//! first pass that succeeds:
//!
//! | Pass | Source                           | Method             | Confidence      |
//! |------|----------------------------------|--------------------|-----------------|
//! | 0    | UNDL bibliographic record        | `undl_metadata`    | 1.0             |
//! | 1    | Draft symbol cited in the text   | `symbol_reference` | 0.8             |
//! | 2    | Title similarity (opt-in)        | `title_similarity` | 0.5 × score     |
//!
//! Resolutions that already carry lineage are skipped entirely, so repeated
//! runs issue no metadata requests for them. Links are recorded on both
//! records: the resolution lists its local proposals and each proposal
//! points back at the resolution.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use undocs_common::config::LineageConfig;
use undocs_common::models::index_by_symbol;
use undocs_common::symbols::{is_proposal, normalize_symbol};
use undocs_common::{DocumentRecord, LinkMethod, SymbolKind};

use crate::services::MetadataClient;

pub const METADATA_CONFIDENCE: f32 = 1.0;
pub const SYMBOL_REFERENCE_CONFIDENCE: f32 = 0.8;
/// Title-similarity confidence is this weight times the similarity score
pub const TITLE_SIMILARITY_WEIGHT: f32 = 0.5;

/// Resolver settings
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Run Pass 0 (bibliographic metadata)
    pub use_metadata: bool,
    /// Enables Pass 2 when set
    pub title_similarity_threshold: Option<f64>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            use_metadata: true,
            title_similarity_threshold: None,
        }
    }
}

impl From<&LineageConfig> for ResolverOptions {
    fn from(config: &LineageConfig) -> Self {
        Self {
            use_metadata: config.use_metadata,
            title_similarity_threshold: config.title_similarity_threshold,
        }
    }
}

/// Counters for one resolver run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub resolutions: usize,
    pub already_linked: usize,
    pub undl_metadata: usize,
    pub symbol_reference: usize,
    pub title_similarity: usize,
    pub unlinked: usize,
    pub metadata_requests: usize,
}

/// A link chosen by one pass, not yet applied
#[derive(Debug, Clone)]
struct ProposedLink {
    method: LinkMethod,
    confidence: f32,
    base_proposal: String,
    /// Drafts to connect when present in the collection
    candidates: Vec<String>,
}

/// Runs the linking cascade over a document collection
pub struct LineageResolver {
    metadata: Option<Arc<dyn MetadataClient>>,
    options: ResolverOptions,
}

impl LineageResolver {
    /// `metadata` may be `None`, which behaves like `use_metadata = false`
    pub fn new(metadata: Option<Arc<dyn MetadataClient>>, options: ResolverOptions) -> Self {
        Self { metadata, options }
    }

    fn metadata_client(&self) -> Option<&Arc<dyn MetadataClient>> {
        if self.options.use_metadata {
            self.metadata.as_ref()
        } else {
            None
        }
    }

    /// Link every resolution in `documents`, mutating records in place
    pub async fn link_documents(&self, documents: &mut [DocumentRecord]) -> LinkStats {
        let index = index_by_symbol(documents);
        let mut stats = LinkStats::default();

        let resolutions: Vec<usize> = documents
            .iter()
            .enumerate()
            .filter(|(_, d)| d.kind() == SymbolKind::Resolution)
            .map(|(i, _)| i)
            .collect();

        for i in resolutions {
            stats.resolutions += 1;

            if documents[i].is_linked() {
                debug!(symbol = %documents[i].symbol, "Already linked, skipping");
                stats.already_linked += 1;
                continue;
            }

            let link = match self.metadata_pass(&documents[i], &mut stats).await {
                Some(link) => Some(link),
                None => symbol_reference_pass(&documents[i]).or_else(|| {
                    self.options
                        .title_similarity_threshold
                        .and_then(|threshold| title_similarity_pass(documents, i, threshold))
                }),
            };

            match link {
                Some(link) => {
                    match link.method {
                        LinkMethod::UndlMetadata => stats.undl_metadata += 1,
                        LinkMethod::SymbolReference => stats.symbol_reference += 1,
                        LinkMethod::TitleSimilarity => stats.title_similarity += 1,
                        LinkMethod::None => {}
                    }
                    apply_link(documents, &index, i, link);
                }
                None => {
                    debug!(symbol = %documents[i].symbol, "No lineage found");
                    stats.unlinked += 1;
                }
            }
        }

        info!(
            resolutions = stats.resolutions,
            already_linked = stats.already_linked,
            undl_metadata = stats.undl_metadata,
            symbol_reference = stats.symbol_reference,
            title_similarity = stats.title_similarity,
            unlinked = stats.unlinked,
            "Lineage resolution complete"
        );

        stats
    }

    /// Pass 0: authoritative bibliographic metadata
    async fn metadata_pass(
        &self,
        resolution: &DocumentRecord,
        stats: &mut LinkStats,
    ) -> Option<ProposedLink> {
        let client = self.metadata_client()?;
        stats.metadata_requests += 1;

        let metadata = client.fetch(&resolution.symbol).await?;
        let base_proposal = metadata.base_proposal?;

        Some(ProposedLink {
            method: LinkMethod::UndlMetadata,
            confidence: METADATA_CONFIDENCE,
            base_proposal,
            candidates: metadata.draft_symbols,
        })
    }
}

/// Pass 1: first draft symbol cited in the resolution text
fn symbol_reference_pass(resolution: &DocumentRecord) -> Option<ProposedLink> {
    let base = resolution
        .symbol_references
        .iter()
        .find(|s| is_proposal(s))?;

    Some(ProposedLink {
        method: LinkMethod::SymbolReference,
        confidence: SYMBOL_REFERENCE_CONFIDENCE,
        base_proposal: base.clone(),
        candidates: vec![base.clone()],
    })
}

/// Strip the session numbering prefix (`80/1. `), collapse whitespace,
/// lowercase
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim_start();
    let digits_then = |s: &str, sep: char| -> Option<usize> {
        let n = s.chars().take_while(|c| c.is_ascii_digit()).count();
        (n > 0 && s[n..].starts_with(sep)).then_some(n + 1)
    };

    let stripped = digits_then(trimmed, '/')
        .and_then(|a| digits_then(&trimmed[a..], '.').map(|b| &trimmed[a + b..]))
        .unwrap_or(trimmed);

    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Pass 2: closest unlinked local proposal by title
fn title_similarity_pass(
    documents: &[DocumentRecord],
    resolution_idx: usize,
    threshold: f64,
) -> Option<ProposedLink> {
    let title = normalize_title(&documents[resolution_idx].title);
    if title.is_empty() {
        return None;
    }

    let (best, score) = documents
        .iter()
        .filter(|d| d.kind() == SymbolKind::Proposal && d.linked_resolution_symbol.is_none())
        .filter_map(|d| {
            let candidate = normalize_title(&d.title);
            if candidate.is_empty() {
                return None;
            }
            Some((d, strsim::normalized_levenshtein(&title, &candidate)))
        })
        .fold(None::<(&DocumentRecord, f64)>, |best, (d, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((d, score)),
        })?;

    if score < threshold {
        return None;
    }

    Some(ProposedLink {
        method: LinkMethod::TitleSimilarity,
        confidence: TITLE_SIMILARITY_WEIGHT * score as f32,
        base_proposal: best.symbol.clone(),
        candidates: vec![best.symbol.clone()],
    })
}

/// Record `link` on the resolution and on every candidate held locally
fn apply_link(
    documents: &mut [DocumentRecord],
    index: &HashMap<String, usize>,
    resolution_idx: usize,
    link: ProposedLink,
) {
    let resolution_symbol = documents[resolution_idx].symbol.clone();
    let mut linked = Vec::new();

    for candidate in &link.candidates {
        let Some(&j) = index.get(&normalize_symbol(candidate)) else {
            continue;
        };
        if j == resolution_idx {
            continue;
        }

        let previous = documents[j]
            .linked_resolution_symbol
            .clone()
            .filter(|previous| *previous != resolution_symbol);

        if let Some(previous) = previous {
            if documents[j].link_confidence >= link.confidence {
                debug!(
                    proposal = %documents[j].symbol,
                    linked_to = %previous,
                    resolution = %resolution_symbol,
                    "Proposal already linked with equal or higher confidence"
                );
                continue;
            }

            // The stronger link moves the proposal; detach it from the old resolution
            let proposal_symbol = documents[j].symbol.clone();
            if let Some(&k) = index.get(&normalize_symbol(&previous)) {
                documents[k]
                    .linked_proposal_symbols
                    .retain(|s| *s != proposal_symbol);
            }
            debug!(
                proposal = %proposal_symbol,
                previous = %previous,
                resolution = %resolution_symbol,
                "Proposal back-reference replaced"
            );
        }

        let proposal = &mut documents[j];
        proposal.linked_resolution_symbol = Some(resolution_symbol.clone());
        proposal.link_method = link.method;
        proposal.link_confidence = link.confidence;
        linked.push(proposal.symbol.clone());
    }

    let resolution = &mut documents[resolution_idx];
    resolution.base_proposal_symbol = Some(link.base_proposal);
    resolution.link_method = link.method;
    resolution.link_confidence = link.confidence;
    for symbol in &linked {
        resolution.add_linked_proposal(symbol);
    }

    debug!(
        resolution = %resolution.symbol,
        method = link.method.as_str(),
        confidence = link.confidence,
        local_proposals = linked.len(),
        "Linked resolution"
    );
}
