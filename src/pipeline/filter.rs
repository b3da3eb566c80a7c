//! Novelty filter for search results.
//!
//! Computes which results of a fresh batch have not been sent before.
//! A result is identified by its link only; title or snippet changes on a
//! known link do not make it novel again.

use std::collections::HashSet;

use crate::models::{CandidateResult, History, ResultBatch};

/// Results of `batch` whose link is not in `history`, in batch order.
///
/// A link repeated within the batch is kept once, at its first position.
pub fn filter_novel(batch: &[CandidateResult], history: &History) -> ResultBatch {
    let mut emitted: HashSet<&str> = HashSet::with_capacity(batch.len());
    let mut novel = Vec::new();

    for result in batch {
        if !history.contains(&result.link) && emitted.insert(result.link.as_str()) {
            novel.push(result.clone());
        }
    }
    novel
}

/// Record every result's link in `history`. Returns how many were new.
pub fn mark_seen(history: &mut History, results: &[CandidateResult]) -> usize {
    results
        .iter()
        .filter(|r| history.insert(r.link.as_str()))
        .count()
}
