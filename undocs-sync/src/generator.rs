//! Candidate symbol generation
//!
//! Generation is a pure function of `(pattern, cursor)`: the symbols emitted
//! for a sequence number never depend on what was generated before, so a
//! scan can be paused and resumed by persisting nothing but the cursor.

use crate::patterns::{Pattern, NUMBER_PLACEHOLDER};

/// All symbols sharing one sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolBatch {
    pub number: u64,
    pub symbols: Vec<String>,
}

/// Cartesian product of the list variables, first variable varying slowest.
///
/// Each combination holds one value index per list variable.
fn combinations(lists: &[(String, Vec<String>)]) -> Vec<Vec<usize>> {
    if lists.is_empty() {
        return vec![Vec::new()];
    }

    let total: usize = lists.iter().map(|(_, values)| values.len()).product();
    let mut result = Vec::with_capacity(total);
    let mut current = vec![0usize; lists.len()];

    loop {
        result.push(current.clone());

        // Odometer increment from the last variable
        let mut pos = lists.len();
        loop {
            if pos == 0 {
                return result;
            }
            pos -= 1;
            current[pos] += 1;
            if current[pos] < lists[pos].1.len() {
                break;
            }
            current[pos] = 0;
        }
    }
}

/// Render every symbol for sequence number `number`
pub fn symbols_at(pattern: &Pattern, number: u64) -> Vec<String> {
    let number_str = number.to_string();
    let lists = pattern.lists();

    combinations(lists)
        .into_iter()
        .filter_map(|combo| {
            pattern.template().render(|name| {
                if name == NUMBER_PLACEHOLDER {
                    return Some(number_str.as_str());
                }
                if let Some(i) = lists.iter().position(|(key, _)| key == name) {
                    return Some(lists[i].1[combo[i]].as_str());
                }
                pattern
                    .scalars()
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| value.as_str())
            })
        })
        .collect()
}

/// Unbounded stream of batches starting at `pattern.start()`
pub fn batches(pattern: &Pattern) -> impl Iterator<Item = SymbolBatch> + '_ {
    (pattern.start()..).map(move |number| SymbolBatch {
        number,
        symbols: symbols_at(pattern, number),
    })
}

/// Flat symbol stream starting at `pattern.start()`.
///
/// `limit` caps the number of symbols (it may cut a batch short);
/// `None` yields an infinite sequence.
pub fn generate(pattern: &Pattern, limit: Option<usize>) -> impl Iterator<Item = String> + '_ {
    batches(pattern)
        .flat_map(|batch| batch.symbols)
        .take(limit.unwrap_or(usize::MAX))
}
