//! Code-aware tokenizer.
//!
//! Converts chunk text into normalized lowercase terms with occurrence
//! counts. Identifiers are split on camelCase / snake_case / kebab-case
//! boundaries; call-shaped names, declared names, import clauses, string
//! literal words, and path segments all contribute. Extraction order and
//! counting are deterministic.

use regex::Regex;
use std::collections::HashMap;

/// Terms shorter than this never index.
const MIN_TERM_LEN: usize = 2;
/// Fallback words longer than this are noise (minified blobs, base64).
const MAX_WORD_LEN: usize = 49;

/// Split an identifier into lowercase components along camel, snake, and
/// kebab boundaries. Single-character components are dropped.
pub fn split_identifier(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = name.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' {
            flush(&mut parts, &mut current);
            continue;
        }
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // aB boundary, or the last upper of an acronym run (HTTPServer).
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_lower) {
                flush(&mut parts, &mut current);
            }
        }
        current.push(c.to_ascii_lowercase());
    }
    flush(&mut parts, &mut current);
    parts
}

fn flush(parts: &mut Vec<String>, current: &mut String) {
    if current.len() > 1 {
        parts.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Term extractor with pre-compiled patterns. One per engine.
pub struct TermExtractor {
    camel: Regex,
    snake: Regex,
    kebab: Regex,
    call: Regex,
    declared: Regex,
    import_clause: Regex,
    import_default: Regex,
    string_lit: Regex,
    pathlike: Regex,
}

impl Default for TermExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TermExtractor {
    pub fn new() -> Self {
        Self {
            camel: Regex::new(r"\b(?:[a-z][a-z0-9]*(?:[A-Z][a-zA-Z0-9]*)+|[A-Z][a-z0-9]+(?:[A-Z][a-zA-Z0-9]*)+)\b").unwrap(),
            snake: Regex::new(r"\b[A-Za-z][A-Za-z0-9]*(?:_[A-Za-z0-9]+)+\b").unwrap(),
            kebab: Regex::new(r"\b[a-z][a-z0-9]*(?:-[a-z0-9]+)+\b").unwrap(),
            call: Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]{2,})\s*\(").unwrap(),
            declared: Regex::new(r"\b(?:class|interface|type|enum|struct|trait)\s+([A-Za-z_]\w*)").unwrap(),
            import_clause: Regex::new(r"(?:import|export)\s*\{([^}]*)\}").unwrap(),
            import_default: Regex::new(r"import\s+([A-Za-z_]\w*)\s+from").unwrap(),
            string_lit: Regex::new(r#""([^"\n]{1,80})"|'([^'\n]{1,80})'|`([^`\n]{1,80})`"#).unwrap(),
            pathlike: Regex::new(r"[\w.@-]+(?:/[\w.@-]+)+").unwrap(),
        }
    }

    /// Extract `term → count` for a chunk body. Rule 1–6 matches contribute
    /// one count per structural occurrence; word, string-literal, and path
    /// occurrences contribute their raw counts.
    pub fn extract(&self, content: &str) -> HashMap<String, u32> {
        let mut terms: HashMap<String, u32> = HashMap::new();
        let bump = |terms: &mut HashMap<String, u32>, term: &str| {
            if term.len() >= MIN_TERM_LEN {
                *terms.entry(term.to_lowercase()).or_insert(0) += 1;
            }
        };

        // 1–3. Shaped identifiers: whole form plus components.
        for re in [&self.camel, &self.snake, &self.kebab] {
            for m in re.find_iter(content) {
                bump(&mut terms, m.as_str());
                for part in split_identifier(m.as_str()) {
                    bump(&mut terms, &part);
                }
            }
        }

        // 4. Call-shaped names.
        for cap in self.call.captures_iter(content) {
            if let Some(name) = cap.get(1) {
                bump(&mut terms, name.as_str());
            }
        }

        // 5. Declared names.
        for cap in self.declared.captures_iter(content) {
            if let Some(name) = cap.get(1) {
                bump(&mut terms, name.as_str());
            }
        }

        // 6. Import/export clause names, keywords excluded.
        for cap in self.import_clause.captures_iter(content) {
            if let Some(clause) = cap.get(1) {
                for raw in clause.as_str().split(',') {
                    for word in raw.split_whitespace() {
                        if !matches!(word, "as" | "from" | "default" | "type") {
                            bump(&mut terms, word.trim_matches(|c: char| !c.is_alphanumeric()));
                        }
                    }
                }
            }
        }
        for cap in self.import_default.captures_iter(content) {
            if let Some(name) = cap.get(1) {
                bump(&mut terms, name.as_str());
            }
        }

        // 7. Words inside string literals.
        for cap in self.string_lit.captures_iter(content) {
            let lit = cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3));
            if let Some(lit) = lit {
                for word in lit.as_str().split(|c: char| !c.is_alphanumeric()) {
                    if (3..=50).contains(&word.len()) {
                        bump(&mut terms, word);
                    }
                }
            }
        }

        // 8. Fallback words with punctuation stripped.
        for word in content.split(|c: char| !c.is_alphanumeric() && c != '_') {
            let word = word.trim_matches('_');
            if word.len() >= 3 && word.len() <= MAX_WORD_LEN {
                bump(&mut terms, word);
            }
        }

        // 9. Path segments.
        for m in self.pathlike.find_iter(content) {
            for segment in m.as_str().split('/') {
                let segment = segment.trim_matches('.');
                if segment.len() > 1 {
                    bump(&mut terms, segment);
                }
            }
        }

        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms_of(content: &str) -> HashMap<String, u32> {
        TermExtractor::new().extract(content)
    }

    #[test]
    fn splits_camel_case() {
        let parts = split_identifier("loginWithOtp");
        assert_eq!(parts, vec!["login", "with", "otp"]);
    }

    #[test]
    fn splits_acronym_runs() {
        assert_eq!(split_identifier("HTTPServer"), vec!["http", "server"]);
        assert_eq!(split_identifier("parseJSONBody"), vec!["parse", "json", "body"]);
    }

    #[test]
    fn splits_snake_and_kebab() {
        assert_eq!(split_identifier("user_profile_id"), vec!["user", "profile", "id"]);
        assert_eq!(split_identifier("fast-index"), vec!["fast", "index"]);
    }

    #[test]
    fn drops_single_char_components() {
        assert_eq!(split_identifier("x_y_total"), vec!["total"]);
    }

    #[test]
    fn camel_identifier_yields_whole_and_parts() {
        let terms = terms_of("const userProfile = load();");
        assert!(terms.contains_key("userprofile"));
        assert!(terms.contains_key("user"));
        assert!(terms.contains_key("profile"));
    }

    #[test]
    fn call_shaped_names_index() {
        let terms = terms_of("validateToken(input)");
        assert!(terms.contains_key("validatetoken"));
    }

    #[test]
    fn declared_names_index() {
        let terms = terms_of("export interface SearchOptions { limit: number }");
        assert!(terms.contains_key("searchoptions"));
    }

    #[test]
    fn import_clause_names_index_without_keywords() {
        let terms = terms_of("import { readFile as read, default as mod } from 'fs/promises';");
        assert!(terms.contains_key("readfile"));
        assert!(terms.contains_key("read"));
        assert!(!terms.contains_key("as"));
        // Path segments of the module specifier index too.
        assert!(terms.contains_key("promises"));
    }

    #[test]
    fn string_literal_words_index() {
        let terms = terms_of(r#"throw new Error("invalid session token");"#);
        assert!(terms.contains_key("invalid"));
        assert!(terms.contains_key("session"));
        assert!(terms.contains_key("token"));
    }

    #[test]
    fn counts_are_deterministic_and_additive() {
        let a = terms_of("retry retry retry");
        assert_eq!(a.get("retry"), Some(&3));
        let b = terms_of("retry retry retry");
        assert_eq!(a, b);
    }

    #[test]
    fn short_and_huge_tokens_are_dropped() {
        let terms = terms_of("a b eh");
        assert!(!terms.contains_key("a"));
        let long = "x".repeat(60);
        let terms = terms_of(&long);
        assert!(!terms.contains_key(long.as_str()));
    }
}
