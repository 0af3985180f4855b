//! Persistent inverted index: term frequencies, document frequencies, and
//! per-chunk term sets.
//!
//! The three tables move together; every public mutation preserves:
//! 1. a term is in `term_frequency` iff it is in `document_frequency` iff
//!    some chunk's term set contains it,
//! 2. `document_frequency[term]` equals the number of chunks with a
//!    positive tf for that term,
//! 3. `term_frequency[term][chunk] > 0` iff `term ∈ chunk_terms[chunk]`,
//! 4. removing a path's chunks prunes every empty term entry.
//!
//! Operations touch only the terms of the affected chunk — never the whole
//! index.

use crate::error::EngineError;
use crate::types::ChunkId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Aggregate figures for `stats()`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InvertedIndexStats {
    pub distinct_terms: usize,
    pub total_chunks: usize,
    pub mean_terms_per_chunk: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    /// term → chunk id → occurrence count.
    term_frequency: HashMap<String, HashMap<ChunkId, u32>>,
    /// term → number of chunks containing it.
    document_frequency: HashMap<String, u32>,
    /// chunk id → its term set.
    chunk_terms: HashMap<ChunkId, BTreeSet<String>>,
    /// chunk id → total term occurrences, for tf normalization.
    chunk_totals: HashMap<ChunkId, u32>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a chunk's terms into all three tables. Fails without mutating
    /// anything if the chunk id is already present.
    pub fn add(
        &mut self,
        chunk_id: &ChunkId,
        terms_with_counts: &HashMap<String, u32>,
    ) -> Result<(), EngineError> {
        if self.chunk_terms.contains_key(chunk_id) {
            return Err(EngineError::IndexInvariant(format!(
                "chunk {chunk_id} added twice"
            )));
        }

        let mut term_set = BTreeSet::new();
        let mut total = 0u32;
        for (term, &count) in terms_with_counts {
            if count == 0 {
                continue;
            }
            self.term_frequency
                .entry(term.clone())
                .or_default()
                .insert(chunk_id.clone(), count);
            *self.document_frequency.entry(term.clone()).or_insert(0) += 1;
            term_set.insert(term.clone());
            total += count;
        }
        self.chunk_terms.insert(chunk_id.clone(), term_set);
        self.chunk_totals.insert(chunk_id.clone(), total);
        Ok(())
    }

    /// Remove a set of chunk ids (all chunks of one path). Decrements
    /// document frequencies and prunes empty term entries. Never fails;
    /// unknown ids are ignored.
    pub fn remove_chunks(&mut self, chunk_ids: &[ChunkId]) {
        for chunk_id in chunk_ids {
            let Some(terms) = self.chunk_terms.remove(chunk_id) else {
                continue;
            };
            self.chunk_totals.remove(chunk_id);
            for term in terms {
                if let Some(bucket) = self.term_frequency.get_mut(&term) {
                    bucket.remove(chunk_id);
                    if bucket.is_empty() {
                        self.term_frequency.remove(&term);
                    }
                }
                match self.document_frequency.get_mut(&term) {
                    Some(df) if *df > 1 => *df -= 1,
                    Some(_) => {
                        self.document_frequency.remove(&term);
                    }
                    None => {}
                }
            }
        }
    }

    /// Current document frequency, or 0.
    pub fn document_frequency(&self, term: &str) -> u32 {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    /// Current term frequency for `(chunk, term)`, or 0.
    pub fn term_frequency(&self, chunk_id: &ChunkId, term: &str) -> u32 {
        self.term_frequency
            .get(term)
            .and_then(|bucket| bucket.get(chunk_id))
            .copied()
            .unwrap_or(0)
    }

    /// The chunks containing a term, with counts. Empty when unknown.
    pub fn postings(&self, term: &str) -> Option<&HashMap<ChunkId, u32>> {
        self.term_frequency.get(term)
    }

    /// A chunk's term set; empty when unknown.
    pub fn chunk_terms(&self, chunk_id: &ChunkId) -> BTreeSet<String> {
        self.chunk_terms.get(chunk_id).cloned().unwrap_or_default()
    }

    /// Total term occurrences within a chunk, for tf normalization.
    pub fn chunk_total_terms(&self, chunk_id: &ChunkId) -> u32 {
        self.chunk_totals.get(chunk_id).copied().unwrap_or(0)
    }

    pub fn contains_chunk(&self, chunk_id: &ChunkId) -> bool {
        self.chunk_terms.contains_key(chunk_id)
    }

    pub fn total_chunks(&self) -> usize {
        self.chunk_terms.len()
    }

    pub fn stats(&self) -> InvertedIndexStats {
        let total_chunks = self.chunk_terms.len();
        let term_refs: usize = self.chunk_terms.values().map(|s| s.len()).sum();
        InvertedIndexStats {
            distinct_terms: self.term_frequency.len(),
            total_chunks,
            mean_terms_per_chunk: if total_chunks == 0 {
                0.0
            } else {
                term_refs as f64 / total_chunks as f64
            },
        }
    }

    /// Empty all tables.
    pub fn clear(&mut self) {
        self.term_frequency.clear();
        self.document_frequency.clear();
        self.chunk_terms.clear();
        self.chunk_totals.clear();
    }

    /// Full cross-table consistency check. Used on snapshot load and by the
    /// property tests; O(index), so never on the hot path.
    pub fn verify(&self) -> Result<(), EngineError> {
        for (term, bucket) in &self.term_frequency {
            if bucket.is_empty() {
                return Err(EngineError::IndexInvariant(format!("empty bucket for '{term}'")));
            }
            let df = self.document_frequency.get(term).copied().unwrap_or(0);
            if df as usize != bucket.len() {
                return Err(EngineError::IndexInvariant(format!(
                    "df mismatch for '{term}': {df} vs {}",
                    bucket.len()
                )));
            }
            for (chunk_id, count) in bucket {
                if *count == 0 {
                    return Err(EngineError::IndexInvariant(format!(
                        "zero count for '{term}' in {chunk_id}"
                    )));
                }
                if !self.chunk_terms.get(chunk_id).is_some_and(|s| s.contains(term)) {
                    return Err(EngineError::IndexInvariant(format!(
                        "'{term}' missing from chunk_terms[{chunk_id}]"
                    )));
                }
            }
        }
        if self.document_frequency.len() != self.term_frequency.len() {
            return Err(EngineError::IndexInvariant(
                "document_frequency and term_frequency key sets differ".into(),
            ));
        }
        for (chunk_id, terms) in &self.chunk_terms {
            for term in terms {
                if self.term_frequency(chunk_id, term) == 0 {
                    return Err(EngineError::IndexInvariant(format!(
                        "chunk_terms[{chunk_id}] lists '{term}' with zero tf"
                    )));
                }
            }
        }
        Ok(())
    }
}
