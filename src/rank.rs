//! Multi-signal ranker.
//!
//! Scores candidate chunks against a processed query: TF-IDF over the
//! inverted index, symbol matches (exact, substring, bounded edit
//! distance), intent-conditioned boosts, framework/pattern mentions, phrase
//! and camelCase boosts, file-importance and quality weights. Variant
//! scores merge by maximum. Near-duplicate results cluster to a single
//! representative and a per-file diversity cap bounds the final list.

use crate::analyze::path_bucket_multiplier;
use crate::index::InvertedIndex;
use crate::query::{ProcessedQuery, QueryIntent, QueryVariant};
use crate::types::{Chunk, ChunkId, SearchOptions, SearchResult, StructuralAttributes};
use std::collections::{HashMap, HashSet};

/// Results scoring below this are never returned.
const SCORE_FLOOR: f64 = 0.1;
/// Per-file cap enforced by the diversity pass.
const MAX_PER_FILE: usize = 3;
/// Selected results may share at most this fraction of symbols/concepts.
const MAX_OVERLAP: f64 = 0.75;
/// Line distance under which same-file results cluster.
const CLUSTER_LINE_SPAN: usize = 10;
/// Filename character-Jaccard threshold for same-directory clustering.
const CLUSTER_NAME_SIMILARITY: f64 = 0.7;

// ---------------------------------------------------------------------------
// Reranker seam — personalization stays a no-op until real data exists
// ---------------------------------------------------------------------------

/// Post-pipeline hook for a pluggable reranking capability. The default
/// weight is the identity.
pub trait Reranker: Send + Sync {
    fn weight(&self, _query: &ProcessedQuery, _chunk_id: &ChunkId) -> f64 {
        1.0
    }
}

/// Identity reranker.
pub struct NoopReranker;

impl Reranker for NoopReranker {}

// ---------------------------------------------------------------------------
// Ranker
// ---------------------------------------------------------------------------

pub struct Ranker<'a> {
    index: &'a InvertedIndex,
    chunks: &'a HashMap<ChunkId, Chunk>,
    attrs: &'a HashMap<ChunkId, StructuralAttributes>,
    reranker: &'a dyn Reranker,
}

struct ScoredChunk {
    chunk_id: ChunkId,
    score: f64,
    signals: Vec<&'static str>,
}

impl<'a> Ranker<'a> {
    pub fn new(
        index: &'a InvertedIndex,
        chunks: &'a HashMap<ChunkId, Chunk>,
        attrs: &'a HashMap<ChunkId, StructuralAttributes>,
        reranker: &'a dyn Reranker,
    ) -> Self {
        Self { index, chunks, attrs, reranker }
    }

    /// Run the full scoring pipeline and return the top results.
    pub fn rank(&self, query: &ProcessedQuery, options: &SearchOptions) -> Vec<SearchResult> {
        let mut merged: HashMap<ChunkId, ScoredChunk> = HashMap::new();

        for variant in &query.variants {
            for chunk_id in self.candidates_for(variant) {
                let Some(chunk) = self.chunks.get(&chunk_id) else { continue };
                if !self.passes_filters(chunk, options) {
                    continue;
                }
                let attrs = self.attrs.get(&chunk_id);
                let (score, signals) = self.score_chunk(query, variant, chunk, attrs, options);
                let weighted = score * variant.weight;
                if !weighted.is_finite() || weighted <= 0.0 {
                    continue;
                }
                merged
                    .entry(chunk_id.clone())
                    .and_modify(|existing| {
                        // Max-merge across variants, not sum.
                        if weighted > existing.score {
                            existing.score = weighted;
                            existing.signals = signals.clone();
                        }
                    })
                    .or_insert(ScoredChunk { chunk_id, score: weighted, signals });
            }
        }

        let mut scored: Vec<ScoredChunk> = merged.into_values().collect();
        for item in &mut scored {
            item.score *= self.reranker.weight(query, &item.chunk_id);
        }
        self.sort_scored(&mut scored);

        if options.enable_clustering {
            scored = self.cluster(scored);
            self.sort_scored(&mut scored);
        }

        self.select_diverse(scored, options)
    }

    /// Candidates: every chunk with a posting for at least one variant term.
    fn candidates_for(&self, variant: &QueryVariant) -> Vec<ChunkId> {
        let mut out: HashSet<ChunkId> = HashSet::new();
        for term in &variant.terms {
            if let Some(postings) = self.index.postings(term) {
                out.extend(postings.keys().cloned());
            }
        }
        let mut out: Vec<ChunkId> = out.into_iter().collect();
        out.sort();
        out
    }

    fn passes_filters(&self, chunk: &Chunk, options: &SearchOptions) -> bool {
        if let Some(lang) = &options.language {
            if !chunk.language.eq_ignore_ascii_case(lang) {
                return false;
            }
        }
        if let Some(substr) = &options.file_path {
            let path = crate::types::display_path(&chunk.path).to_lowercase();
            if !path.contains(&substr.to_lowercase()) {
                return false;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Per-chunk scoring
    // -----------------------------------------------------------------------

    fn score_chunk(
        &self,
        query: &ProcessedQuery,
        variant: &QueryVariant,
        chunk: &Chunk,
        attrs: Option<&StructuralAttributes>,
        options: &SearchOptions,
    ) -> (f64, Vec<&'static str>) {
        let mut signals = Vec::new();
        let content_lower = chunk.content.to_lowercase();
        let path_lower = crate::types::display_path(&chunk.path).to_lowercase();

        // 1. TF-IDF over the variant terms.
        let mut score = self.tfidf(&chunk.id, &variant.terms);
        if score > 0.0 {
            signals.push("tf-idf");
        }

        if options.code_specific_ranking {
            if let Some(attrs) = attrs {
                // 2. Symbol matches.
                let symbol = self.symbol_score(&variant.terms, &query.normalized, attrs, options.fuzzy);
                if symbol > 0.0 {
                    signals.push("symbol");
                }
                score += symbol;

                // 4. Framework / pattern mentions in the query.
                let mut tag_boost = 0.0;
                if attrs.frameworks.iter().any(|f| query.normalized.contains(f.as_str())) {
                    tag_boost += 0.3;
                    signals.push("framework");
                }
                if attrs.patterns.iter().any(|p| query.normalized.contains(p.as_str())) {
                    tag_boost += 0.5;
                    signals.push("pattern");
                }
                score += tag_boost;
            }

            // 5. Exact-phrase boost.
            if !query.normalized.is_empty() && content_lower.contains(&query.normalized) {
                score += 1.5;
                signals.push("phrase");
            }

            // 6. camelCase join of the query tokens.
            if let Some(camel) = camel_of(&query.keywords) {
                if chunk.content.contains(&camel) {
                    score += 1.2;
                    signals.push("camel");
                }
            }

            // 7. Comment-mention bonus.
            let mentions = comment_mentions(&content_lower, &query.normalized);
            if mentions > 0 {
                score += 0.2 * mentions as f64;
                signals.push("comment");
            }

            // 3. Intent-conditioned multiplier.
            let intent_factor = intent_multiplier(query.intent.kind, attrs, &content_lower);
            if intent_factor != 1.0 {
                signals.push("intent");
            }
            score *= intent_factor;
        }

        // 8. File-importance weight.
        score *= path_bucket_multiplier(&path_lower);

        // 9. Quality weight.
        if let Some(attrs) = attrs {
            score *= (1.0 + attrs.quality).min(2.0);
        }

        (score, signals)
    }

    fn tfidf(&self, chunk_id: &ChunkId, terms: &[String]) -> f64 {
        if terms.is_empty() {
            return 0.0;
        }
        let total_chunks = self.index.total_chunks().max(1) as f64;
        let chunk_total = self.index.chunk_total_terms(chunk_id).max(1) as f64;

        let mut sum = 0.0;
        for term in terms {
            let tf = self.index.term_frequency(chunk_id, term) as f64;
            if tf == 0.0 {
                continue;
            }
            let df = self.index.document_frequency(term).max(1) as f64;
            sum += (tf / chunk_total) * (total_chunks / df).ln().max(0.0);
        }
        sum / (terms.len() as f64).sqrt()
    }

    fn symbol_score(
        &self,
        terms: &[String],
        normalized_query: &str,
        attrs: &StructuralAttributes,
        fuzzy: bool,
    ) -> f64 {
        let wants_async = normalized_query.contains("async");
        let mut score = 0.0;

        for term in terms {
            for symbol in &attrs.symbols {
                if symbol == term {
                    score += 2.0;
                } else if symbol.contains(term.as_str()) || term.contains(symbol.as_str()) {
                    score += 1.5;
                } else if fuzzy {
                    let max_len = symbol.len().max(term.len());
                    if max_len > 3 {
                        if let Some(d) = edit_distance_within(symbol, term, 2) {
                            score += 0.5 * (1.0 - d as f64 / max_len as f64);
                        }
                    }
                }
            }
        }

        // Exported and async declarations matching the query add on top.
        for decl in attrs.functions.iter().chain(&attrs.classes) {
            let name_lower = decl.name.to_lowercase();
            if terms.iter().any(|t| name_lower.contains(t.as_str())) {
                if decl.exported {
                    score += 0.3;
                }
                if decl.is_async && wants_async {
                    score += 0.2;
                }
            }
        }

        score
    }

    // -----------------------------------------------------------------------
    // Clustering and diversity
    // -----------------------------------------------------------------------

    /// Collapse near-duplicates (same file within ten lines, or same
    /// directory with near-identical file names) to their highest-scoring
    /// member, with a small log-size boost for larger clusters.
    fn cluster(&self, scored: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        let mut reps: Vec<(ScoredChunk, usize)> = Vec::new();

        'next: for item in scored {
            let Some(chunk) = self.chunks.get(&item.chunk_id) else { continue };
            for (rep, size) in &mut reps {
                let Some(rep_chunk) = self.chunks.get(&rep.chunk_id) else { continue };
                if same_cluster(chunk, rep_chunk) {
                    *size += 1;
                    continue 'next;
                }
            }
            reps.push((item, 1));
        }

        reps.into_iter()
            .map(|(mut rep, size)| {
                if size > 1 {
                    rep.score += 0.1 * (size as f64).ln();
                    rep.signals.push("cluster");
                }
                rep
            })
            .collect()
    }

    /// Enforce the per-file cap, symbol/concept overlap limit, score floor,
    /// and result count; produce the final [`SearchResult`]s.
    fn select_diverse(
        &self,
        scored: Vec<ScoredChunk>,
        options: &SearchOptions,
    ) -> Vec<SearchResult> {
        let floor = SCORE_FLOOR.max(options.min_score);
        let mut per_file: HashMap<String, usize> = HashMap::new();
        let mut selected_tags: Vec<HashSet<String>> = Vec::new();
        let mut out = Vec::new();

        for item in scored {
            if out.len() >= options.max_results {
                break;
            }
            if item.score < floor {
                continue;
            }
            let Some(chunk) = self.chunks.get(&item.chunk_id) else { continue };
            let path_key = crate::types::display_path(&chunk.path);

            let count = per_file.entry(path_key.clone()).or_insert(0);
            if *count >= MAX_PER_FILE {
                continue;
            }

            let tags = self.tag_set(&item.chunk_id);
            if !tags.is_empty()
                && selected_tags.iter().any(|prev| overlap_ratio(&tags, prev) > MAX_OVERLAP)
            {
                continue;
            }

            *count += 1;
            selected_tags.push(tags);
            out.push(SearchResult {
                chunk_id: item.chunk_id.clone(),
                path: chunk.path.clone(),
                language: chunk.language.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                score: item.score,
                relevance: relevance_of(item.score),
                explanation: item.signals.join("+"),
                content: Some(chunk.content.clone()),
            });
        }

        out
    }

    fn tag_set(&self, chunk_id: &ChunkId) -> HashSet<String> {
        let Some(attrs) = self.attrs.get(chunk_id) else {
            return HashSet::new();
        };
        attrs.symbols.iter().cloned().chain(attrs.concepts.iter().cloned()).collect()
    }

    fn sort_scored(&self, scored: &mut [ScoredChunk]) {
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let pa = self.chunks.get(&a.chunk_id).map(|c| c.path.clone()).unwrap_or_default();
                    let pb = self.chunks.get(&b.chunk_id).map(|c| c.path.clone()).unwrap_or_default();
                    pa.cmp(&pb)
                })
                .then_with(|| {
                    let la = self.chunks.get(&a.chunk_id).map(|c| c.start_line).unwrap_or(0);
                    let lb = self.chunks.get(&b.chunk_id).map(|c| c.start_line).unwrap_or(0);
                    la.cmp(&lb)
                })
        });
    }
}

// ---------------------------------------------------------------------------
// Scoring helpers
// ---------------------------------------------------------------------------

/// Monotone squash of a raw score into `[0, 1]`.
pub fn relevance_of(score: f64) -> f64 {
    (score / (score + 5.0)).clamp(0.0, 1.0)
}

fn intent_multiplier(
    intent: QueryIntent,
    attrs: Option<&StructuralAttributes>,
    content_lower: &str,
) -> f64 {
    match intent {
        QueryIntent::FunctionSearch => {
            if attrs.is_some_and(|a| !a.functions.is_empty()) {
                1.5
            } else {
                1.0
            }
        }
        QueryIntent::ClassSearch => {
            if attrs.is_some_and(|a| {
                !a.classes.is_empty() || !a.interfaces.is_empty() || !a.types.is_empty()
            }) {
                1.5
            } else {
                1.0
            }
        }
        QueryIntent::DebugSearch => {
            if ["error", "exception", "try", "catch"].iter().any(|w| content_lower.contains(w)) {
                1.8
            } else {
                1.0
            }
        }
        QueryIntent::ImplementationSearch => {
            if attrs.is_some_and(|a| !a.functions.is_empty() || !a.classes.is_empty()) {
                1.3
            } else {
                1.0
            }
        }
        _ => 1.0,
    }
}

fn camel_of(keywords: &[String]) -> Option<String> {
    if keywords.len() < 2 {
        return None;
    }
    let mut out = String::new();
    for (i, word) in keywords.iter().enumerate() {
        if i == 0 {
            out.push_str(word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    Some(out)
}

fn comment_mentions(content_lower: &str, normalized_query: &str) -> usize {
    if normalized_query.is_empty() {
        return 0;
    }
    content_lower
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            (trimmed.starts_with("//") || trimmed.starts_with('#') || trimmed.starts_with('*'))
                && trimmed.contains(normalized_query)
        })
        .count()
}

/// Levenshtein distance if it is ≤ `cap`, else `None`. Bails early on a
/// length difference alone.
fn edit_distance_within(a: &str, b: &str, cap: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > cap {
        return None;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
            row_min = row_min.min(curr[j + 1]);
        }
        if row_min > cap {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    (prev[b.len()] <= cap).then_some(prev[b.len()])
}

fn same_cluster(a: &Chunk, b: &Chunk) -> bool {
    if a.path == b.path {
        return a.start_line.abs_diff(b.start_line) <= CLUSTER_LINE_SPAN;
    }
    if a.path.parent() == b.path.parent() {
        let name_a = a.path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
        let name_b = b.path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
        return char_jaccard(&name_a, &name_b) > CLUSTER_NAME_SIMILARITY;
    }
    false
}

/// Jaccard similarity over the character sets of two strings.
fn char_jaccard(a: &str, b: &str) -> f64 {
    let sa: HashSet<char> = a.chars().collect();
    let sb: HashSet<char> = b.chars().collect();
    if sa.is_empty() && sb.is_empty() {
        return 1.0;
    }
    let inter = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    inter / union
}

/// Fraction of `candidate`'s tags already present in `selected`.
fn overlap_ratio(candidate: &HashSet<String>, selected: &HashSet<String>) -> f64 {
    if candidate.is_empty() {
        return 0.0;
    }
    let inter = candidate.intersection(selected).count() as f64;
    inter / candidate.len() as f64
}
