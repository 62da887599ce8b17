use std::collections::HashSet;

use super::Record;

/// Stable union of `existing` and `incoming` by record id.
///
/// The first occurrence of each id wins and keeps its position; later copies,
/// including duplicates inside `incoming` itself, are dropped.
pub fn merge_unique<R: Record>(existing: Vec<R>, incoming: Vec<R>) -> Vec<R> {
    let mut seen: HashSet<R::Id> = HashSet::with_capacity(existing.len() + incoming.len());
    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    for record in existing.into_iter().chain(incoming) {
        if seen.insert(record.id().clone()) {
            merged.push(record);
        }
    }
    merged
}
