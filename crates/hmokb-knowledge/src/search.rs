//! Cosine-similarity retrieval over an in-memory corpus.

use crate::canon::AttributeFilter;
use crate::store::IndexCorpus;
use hmokb_core::types::Hit;
use serde::Serialize;

/// Cosine similarity in `[-1, 1]`. A zero vector on either side scores 0.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0)
}

/// Score `candidates` (corpus row indices) against `query` and keep the
/// best `k`. Ties keep storage order.
fn rank(corpus: &IndexCorpus, query: &[f32], candidates: &[usize], k: usize) -> Vec<Hit> {
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .map(|&i| (i, cosine(query, &corpus.vectors()[i])))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);
    scored
        .into_iter()
        .map(|(i, score)| Hit {
            entry: corpus.entries()[i].clone(),
            score,
        })
        .collect()
}

/// Top-`k` entries of the whole corpus.
pub fn search_broad(corpus: &IndexCorpus, query: &[f32], k: usize) -> Vec<Hit> {
    let all: Vec<usize> = (0..corpus.len()).collect();
    rank(corpus, query, &all, k)
}

/// Rows whose table cell matches the filter, in storage order.
pub fn filtered_candidates(corpus: &IndexCorpus, filter: &AttributeFilter) -> Vec<usize> {
    corpus
        .entries()
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.cell().is_some_and(|cell| filter.matches(cell)))
        .map(|(i, _)| i)
        .collect()
}

/// Top-`k` among the given candidate rows.
pub fn search_candidates(
    corpus: &IndexCorpus,
    query: &[f32],
    candidates: &[usize],
    k: usize,
) -> Vec<Hit> {
    rank(corpus, query, candidates, k)
}

/// Broad and strictly filtered hits for the same query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DualResults {
    pub broad: Vec<Hit>,
    pub filtered: Vec<Hit>,
}

impl DualResults {
    /// Context snippets for answer composition, broad hits first.
    pub fn snippets(&self) -> Vec<String> {
        self.broad
            .iter()
            .chain(&self.filtered)
            .map(Hit::snippet)
            .collect()
    }
}
