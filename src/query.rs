//! Query processor: normalization, entity extraction, intent
//! classification, and variant expansion.
//!
//! Everything here is deterministic and does no I/O. The variant set always
//! contains the normalized query first at full weight; expansions carry a
//! reduced weight and are capped.

use crate::tokenize::split_identifier;
use regex::Regex;
use serde::Serialize;

/// Weight each expanded variant contributes relative to the original.
pub const VARIANT_WEIGHT: f64 = 0.7;
/// Variant cap on the lean lexical path.
pub const MAX_VARIANTS_LEXICAL: usize = 5;
/// Variant cap when semantic expansion is enabled.
pub const MAX_VARIANTS_EXPANDED: usize = 15;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "in", "on", "of", "to", "for",
    "with", "and", "or", "not", "do", "does", "did", "how", "what", "where", "why", "when",
    "which", "who", "me", "my", "i", "you", "your", "can", "could", "should", "would", "this",
    "that", "it", "its", "please", "all", "any", "some",
];

// ---------------------------------------------------------------------------
// Intent
// ---------------------------------------------------------------------------

/// Closed intent label set, chosen by deterministic feature scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    FunctionSearch,
    ClassSearch,
    DebugSearch,
    ImplementationSearch,
    ConceptSearch,
    PatternSearch,
    ArchitectureSearch,
    UsageSearch,
    General,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Intent {
    pub kind: QueryIntent,
    /// Margin between the top and second score, clamped to `[0.1, 1.0]`.
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Processed query
// ---------------------------------------------------------------------------

/// One query form the ranker scores against.
#[derive(Clone, Debug, Serialize)]
pub struct QueryVariant {
    pub text: String,
    pub weight: f64,
    /// Normalized terms of this variant, identifier-split.
    pub terms: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProcessedQuery {
    pub original: String,
    pub normalized: String,
    pub intent: Intent,
    /// Identifier-shaped and quoted entities found in the raw query.
    pub entities: Vec<String>,
    /// Normalized tokens minus stop words.
    pub keywords: Vec<String>,
    /// Variant 0 is always the normalized query at weight 1.0.
    pub variants: Vec<QueryVariant>,
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

pub struct QueryProcessor {
    shaped_ident: Regex,
    call_shaped: Regex,
    quoted: Regex,
}

impl Default for QueryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryProcessor {
    pub fn new() -> Self {
        Self {
            shaped_ident: Regex::new(
                r"\b(?:[a-z]+(?:[A-Z][a-zA-Z0-9]*)+|[A-Z][a-z0-9]+(?:[A-Z][a-zA-Z0-9]*)+|\w+(?:_\w+)+|[a-z]+(?:-[a-z0-9]+)+)\b",
            )
            .unwrap(),
            call_shaped: Regex::new(r"\b(\w{3,})\s*\(\s*\)?").unwrap(),
            quoted: Regex::new(r#""([^"]+)"|'([^']+)'"#).unwrap(),
        }
    }

    /// Process a raw query. `max_variants` is the cap from the caller's
    /// search options (lexical vs. expanded path).
    pub fn process(&self, raw: &str, max_variants: usize) -> ProcessedQuery {
        let normalized = normalize(raw);
        let entities = self.extract_entities(raw);
        let keywords = keywords_of(&normalized);
        let intent = classify_intent(&normalized, &entities);
        let variants = self.expand_variants(&normalized, &keywords, &entities, max_variants.max(1));

        ProcessedQuery {
            original: raw.to_string(),
            normalized,
            intent,
            entities,
            keywords,
            variants,
        }
    }

    fn extract_entities(&self, raw: &str) -> Vec<String> {
        let mut entities = Vec::new();
        for m in self.shaped_ident.find_iter(raw) {
            push_unique(&mut entities, m.as_str().to_string());
        }
        for cap in self.call_shaped.captures_iter(raw) {
            if let Some(name) = cap.get(1) {
                push_unique(&mut entities, name.as_str().to_string());
            }
        }
        for cap in self.quoted.captures_iter(raw) {
            if let Some(lit) = cap.get(1).or_else(|| cap.get(2)) {
                push_unique(&mut entities, lit.as_str().to_string());
            }
        }
        entities
    }

    // -----------------------------------------------------------------------
    // Variant expansion
    // -----------------------------------------------------------------------

    fn expand_variants(
        &self,
        normalized: &str,
        keywords: &[String],
        entities: &[String],
        max_variants: usize,
    ) -> Vec<QueryVariant> {
        let mut variants = vec![QueryVariant {
            text: normalized.to_string(),
            weight: 1.0,
            terms: terms_of(normalized),
        }];

        let push = |variants: &mut Vec<QueryVariant>, text: String| {
            if variants.len() >= max_variants {
                return;
            }
            if variants.iter().any(|v| v.text == text) || text.is_empty() {
                return;
            }
            let terms = terms_of(&text);
            if terms.is_empty() {
                return;
            }
            variants.push(QueryVariant { text, weight: VARIANT_WEIGHT, terms });
        };

        // (a) identifier-shape variants. Multi-word queries join their
        // keywords; a single shaped token splits through its original-case
        // entity form (normalization lowercases camel boundaries away).
        let shape_tokens: Vec<String> = if keywords.len() >= 2 {
            keywords.to_vec()
        } else {
            entities
                .iter()
                .map(|e| split_identifier(e))
                .find(|parts| parts.len() >= 2)
                .or_else(|| keywords.first().map(|k| split_identifier(k)))
                .unwrap_or_default()
        };
        if shape_tokens.len() >= 2 {
            push(&mut variants, camel_join(&shape_tokens));
            push(&mut variants, pascal_join(&shape_tokens));
            push(&mut variants, shape_tokens.join("_"));
            push(&mut variants, shape_tokens.join("-"));
        }

        // (b) synonym substitution, one word at a time.
        for (i, word) in keywords.iter().enumerate() {
            for synonym in synonyms_for(word) {
                let mut replaced = keywords.to_vec();
                replaced[i] = synonym.to_string();
                push(&mut variants, replaced.join(" "));
            }
        }

        // (c) framework → related terms.
        for word in keywords {
            for related in framework_terms(word) {
                push(&mut variants, format!("{normalized} {related}"));
            }
        }

        // (d) concept-graph one-hop expansion.
        for word in keywords {
            for neighbor in concept_neighbors(word) {
                push(&mut variants, format!("{normalized} {neighbor}"));
            }
        }

        variants
    }
}

// ---------------------------------------------------------------------------
// Normalization and token helpers
// ---------------------------------------------------------------------------

/// Trim, collapse whitespace, drop characters outside the safe set,
/// lowercase.
pub fn normalize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || " _-./'\"()".contains(*c))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn keywords_of(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-'))
        .filter(|w| w.len() > 1 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Terms the ranker matches against the index: whitespace tokens plus their
/// identifier-split components.
pub fn terms_of(text: &str) -> Vec<String> {
    let mut terms = Vec::new();
    for token in text.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-');
        if token.len() > 1 {
            push_unique(&mut terms, token.to_lowercase());
            for part in split_identifier(token) {
                push_unique(&mut terms, part);
            }
        }
    }
    terms
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn camel_join(tokens: &[String]) -> String {
    let mut out = String::new();
    for (i, t) in tokens.iter().enumerate() {
        if i == 0 {
            out.push_str(t);
        } else {
            out.push_str(&capitalize(t));
        }
    }
    out
}

fn pascal_join(tokens: &[String]) -> String {
    tokens.iter().map(|t| capitalize(t)).collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Intent classification
// ---------------------------------------------------------------------------

fn classify_intent(normalized: &str, entities: &[String]) -> Intent {
    let words: Vec<&str> = normalized.split_whitespace().collect();
    let has_word = |w: &str| words.contains(&w);
    let has_question = ["what", "how", "why", "where", "when", "which"].iter().any(|w| has_word(w));
    let has_code_shape = !entities.is_empty() || normalized.contains("()") || normalized.contains("::");
    let has_verb = |v: &str| has_word(v);

    // (intent, score) in fixed priority order for stable tie-breaks.
    let scores: [(QueryIntent, u32); 9] = [
        (QueryIntent::DebugSearch, {
            let mut s = 0;
            for w in ["error", "exception", "bug", "crash", "broken", "failing"] {
                if normalized.contains(w) {
                    s += 2;
                }
            }
            if has_verb("fix") || has_verb("debug") {
                s += 2;
            }
            s
        }),
        (QueryIntent::FunctionSearch, {
            let mut s = 0;
            if has_word("function") || has_word("method") || has_word("fn") {
                s += 2;
            }
            if normalized.contains("()") {
                s += 2;
            }
            if (has_verb("find") || has_verb("search") || has_verb("get")) && has_code_shape {
                s += 1;
            }
            s
        }),
        (QueryIntent::ClassSearch, {
            let mut s = 0;
            for w in ["class", "interface", "struct", "enum", "model"] {
                if has_word(w) {
                    s += 2;
                }
            }
            s
        }),
        (QueryIntent::UsageSearch, {
            let mut s = 0;
            if has_word("usage") || has_word("example") || has_word("examples") {
                s += 2;
            }
            if has_verb("use") || normalized.contains("how to use") || has_word("called") {
                s += 2;
            }
            s
        }),
        (QueryIntent::ImplementationSearch, {
            let mut s = 0;
            if has_verb("create") || has_verb("build") || has_word("implement") || has_word("implementation") {
                s += 2;
            }
            if normalized.contains("how to") {
                s += 1;
            }
            s
        }),
        (QueryIntent::ArchitectureSearch, {
            let mut s = 0;
            for w in ["architecture", "structure", "design", "overview"] {
                if has_word(w) {
                    s += 2;
                }
            }
            s
        }),
        (QueryIntent::PatternSearch, if has_word("pattern") || has_word("patterns") { 3 } else { 0 }),
        (QueryIntent::ConceptSearch, {
            let mut s = 0;
            if has_word("concept") || has_verb("explain") {
                s += 2;
            }
            if has_question && !has_code_shape {
                s += 1;
            }
            s
        }),
        (QueryIntent::General, 1),
    ];

    // Strict > keeps the earliest entry on ties.
    let mut top_idx = 0usize;
    for (i, (_, s)) in scores.iter().enumerate() {
        if *s > scores[top_idx].1 {
            top_idx = i;
        }
    }
    let (kind, top) = scores[top_idx];
    let second = scores
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != top_idx)
        .map(|(_, (_, s))| *s)
        .max()
        .unwrap_or(0);

    let margin = if top == 0 { 0.0 } else { (top.saturating_sub(second)) as f64 / top as f64 };
    Intent { kind, confidence: margin.clamp(0.1, 1.0) }
}

// ---------------------------------------------------------------------------
// Expansion tables
// ---------------------------------------------------------------------------

fn synonyms_for(word: &str) -> &'static [&'static str] {
    match word {
        "auth" => &["authentication", "login"],
        "authentication" => &["auth", "login"],
        "login" => &["auth", "signin"],
        "db" => &["database"],
        "database" => &["db", "storage"],
        "config" => &["configuration", "settings"],
        "configuration" => &["config", "settings"],
        "error" => &["exception", "failure"],
        "fetch" => &["request", "load"],
        "delete" => &["remove"],
        "create" => &["add", "new"],
        "test" => &["spec"],
        "user" => &["account", "profile"],
        "function" => &["method"],
        _ => &[],
    }
}

fn framework_terms(word: &str) -> &'static [&'static str] {
    match word {
        "react" => &["component", "hook"],
        "nextjs" | "next" => &["page", "route"],
        "express" => &["middleware", "route"],
        "prisma" => &["schema", "query"],
        "graphql" => &["resolver", "schema"],
        "vue" => &["component"],
        _ => &[],
    }
}

fn concept_neighbors(word: &str) -> &'static [&'static str] {
    match word {
        "authentication" | "auth" => &["session", "token"],
        "caching" | "cache" => &["memoize", "ttl"],
        "routing" | "route" => &["navigation", "redirect"],
        "validation" | "validate" => &["schema", "sanitize"],
        "search" => &["index", "rank"],
        "logging" | "log" => &["tracing", "logger"],
        "pagination" => &["cursor", "offset"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process(q: &str) -> ProcessedQuery {
        QueryProcessor::new().process(q, MAX_VARIANTS_LEXICAL)
    }

    #[test]
    fn normalizes_whitespace_case_and_junk() {
        assert_eq!(normalize("  Find\tthe  Login!!  "), "find the login");
        assert_eq!(normalize("user_profile"), "user_profile");
    }

    #[test]
    fn variants_include_normalized_first_and_are_bounded() {
        let q = process("user profile");
        assert_eq!(q.variants[0].text, q.normalized);
        assert_eq!(q.variants[0].weight, 1.0);
        assert!(q.variants.len() <= MAX_VARIANTS_LEXICAL);
        assert!(q.variants.iter().skip(1).all(|v| v.weight == VARIANT_WEIGHT));
    }

    #[test]
    fn shape_variants_cover_case_conventions() {
        let q = QueryProcessor::new().process("user profile", MAX_VARIANTS_EXPANDED);
        let texts: Vec<&str> = q.variants.iter().map(|v| v.text.as_str()).collect();
        assert!(texts.contains(&"userProfile"));
        assert!(texts.contains(&"UserProfile"));
        assert!(texts.contains(&"user_profile"));
        assert!(texts.contains(&"user-profile"));
    }

    #[test]
    fn single_shaped_token_expands_through_components() {
        let q = QueryProcessor::new().process("UserProfile", MAX_VARIANTS_EXPANDED);
        let texts: Vec<&str> = q.variants.iter().map(|v| v.text.as_str()).collect();
        assert!(texts.contains(&"user_profile"));
        // The normalized original is still variant 0.
        assert_eq!(q.variants[0].text, "userprofile");
    }

    #[test]
    fn entities_capture_identifier_shapes() {
        let q = process("where is loginWithOtp() defined");
        assert!(q.entities.iter().any(|e| e == "loginWithOtp"));
    }

    #[test]
    fn keywords_drop_stop_words() {
        let q = process("how to find the user session");
        assert!(!q.keywords.iter().any(|k| k == "the" || k == "how" || k == "to"));
        assert!(q.keywords.iter().any(|k| k == "session"));
    }

    #[test]
    fn intent_debug() {
        let q = process("fix error in token refresh");
        assert_eq!(q.intent.kind, QueryIntent::DebugSearch);
        assert!(q.intent.confidence >= 0.1 && q.intent.confidence <= 1.0);
    }

    #[test]
    fn intent_function() {
        let q = process("find function parseConfig");
        assert_eq!(q.intent.kind, QueryIntent::FunctionSearch);
    }

    #[test]
    fn intent_class() {
        let q = process("class UserRepository");
        assert_eq!(q.intent.kind, QueryIntent::ClassSearch);
    }

    #[test]
    fn intent_general_fallback() {
        let q = process("banana stand");
        assert_eq!(q.intent.kind, QueryIntent::General);
        assert!(q.intent.confidence >= 0.1);
    }

    #[test]
    fn variant_terms_are_split() {
        let q = process("user profile");
        let camel = q.variants.iter().find(|v| v.text == "userProfile");
        if let Some(v) = camel {
            assert!(v.terms.contains(&"userprofile".to_string()));
            assert!(v.terms.contains(&"user".to_string()));
        }
    }

    #[test]
    fn processing_is_deterministic() {
        let a = process("find the user login");
        let b = process("find the user login");
        let at: Vec<_> = a.variants.iter().map(|v| &v.text).collect();
        let bt: Vec<_> = b.variants.iter().map(|v| &v.text).collect();
        assert_eq!(at, bt);
        assert_eq!(a.intent.kind, b.intent.kind);
    }
}
