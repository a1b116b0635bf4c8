//! Document symbol classification
//!
//! Symbols are hierarchical identifiers such as `A/RES/80/142` (an adopted
//! resolution) or `A/C.2/80/L.35/Rev.1` (a draft proposal). Everything here
//! is a pure function over strings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Body prefix, optional qualifiers, `RES`, optional session, sequence number.
/// Security Council style `S/RES/2720 (2024)` and part letters are tolerated.
static RESOLUTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[A-Z][A-Z0-9.]*(?:/[A-Z0-9.\-]+)*?/RES/(?:[A-Z0-9.\-]+/)?\d+(?:\s*\(\d{4}\))?(?:\s+[A-Z](?:-[A-Z])?)?$",
    )
    .expect("resolution regex is valid")
});

/// A draft marker segment `L.<digits>` preceded by at least one body segment.
static PROPOSAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z][A-Z0-9.]*(?:/[A-Z0-9.\-]+)*/L\.\d+(?:/[A-Z0-9.\-]+)*$")
        .expect("proposal regex is valid")
});

/// Draft symbols embedded in running text, with revision/addendum suffixes.
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[A-Z][A-Z0-9.]*(?:/[A-Z0-9.\-]+)*/L\.\d+(?:/(?:Rev|Add|Corr)\.\d+)*")
        .expect("reference regex is valid")
});

/// Classification of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Resolution,
    Proposal,
    Other,
}

impl SymbolKind {
    /// Classify a symbol; proposal takes precedence so the two never overlap
    pub fn of(symbol: &str) -> Self {
        if is_proposal(symbol) {
            SymbolKind::Proposal
        } else if is_resolution(symbol) {
            SymbolKind::Resolution
        } else {
            SymbolKind::Other
        }
    }
}

/// True iff `symbol` follows the adopted-resolution convention
pub fn is_resolution(symbol: &str) -> bool {
    let symbol = symbol.trim();
    RESOLUTION_RE.is_match(symbol) && !PROPOSAL_RE.is_match(symbol)
}

/// True iff `symbol` carries a draft marker (`L.<digits>`)
pub fn is_proposal(symbol: &str) -> bool {
    PROPOSAL_RE.is_match(symbol.trim())
}

/// Case-folded key used for symbol comparisons
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Extract draft symbols mentioned in free text.
///
/// Results are uppercased and deduplicated, in order of first appearance.
pub fn extract_symbol_references(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for m in REFERENCE_RE.find_iter(text) {
        let symbol = normalize_symbol(m.as_str());
        if seen.insert(symbol.clone()) {
            references.push(symbol);
        }
    }

    references
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_resolution() {
        assert!(is_resolution("A/RES/80/142"));
        assert!(is_resolution("A/RES/79/1"));
        assert!(is_resolution("a/res/80/142"));
        assert!(is_resolution("A/RES/ES-10/21"));
        assert!(is_resolution("S/RES/2720 (2024)"));
        assert!(!is_resolution("A/80/L.1"));
        assert!(!is_resolution("A/C.1/80/L.5"));
        assert!(!is_resolution("A/80/100"));
        assert!(!is_resolution(""));
    }

    #[test]
    fn test_is_proposal() {
        assert!(is_proposal("A/80/L.1"));
        assert!(is_proposal("A/C.1/80/L.5"));
        assert!(is_proposal("A/C.2/80/L.35/Rev.1"));
        assert!(is_proposal("A/HRC/58/L.12/Add.1"));
        assert!(!is_proposal("A/RES/80/142"));
        assert!(!is_proposal("A/80/100"));
        assert!(!is_proposal("A/80/PV.64"));
        assert!(!is_proposal("L.1"));
    }

    #[test]
    fn test_kinds_never_overlap() {
        for symbol in [
            "A/RES/80/142",
            "A/80/L.1",
            "A/C.2/80/L.35/Rev.1",
            "A/80/100",
            "A/80/PV.64",
        ] {
            assert!(
                !(is_resolution(symbol) && is_proposal(symbol)),
                "{symbol} classified as both"
            );
        }
        assert_eq!(SymbolKind::of("A/RES/80/142"), SymbolKind::Resolution);
        assert_eq!(SymbolKind::of("A/80/L.1"), SymbolKind::Proposal);
        assert_eq!(SymbolKind::of("A/80/PV.64"), SymbolKind::Other);
    }

    #[test]
    fn test_extract_symbol_references_order_and_dedup() {
        let text = "Recalling draft A/80/L.7 and a/c.3/80/l.12/rev.1, \
                    see also A/80/L.7 (adopted) and report A/80/555.";

        let refs = extract_symbol_references(text);

        assert_eq!(refs, vec!["A/80/L.7", "A/C.3/80/L.12/REV.1"]);
    }

    #[test]
    fn test_extract_symbol_references_trailing_punctuation() {
        let refs = extract_symbol_references("[without reference to a Main Committee (A/80/L.1)].");
        assert_eq!(refs, vec!["A/80/L.1"]);
    }

    #[test]
    fn test_extract_symbol_references_none() {
        let refs = extract_symbol_references("The General Assembly, recalling A/RES/79/1,");
        assert!(refs.is_empty());
    }
}
