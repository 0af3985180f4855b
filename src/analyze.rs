//! Structural analyzer.
//!
//! Regex-driven extraction of declarations, imports/exports, domain and
//! framework tags, complexity, quality, and importance for each chunk.
//! Deliberately heuristic: it accepts partial and malformed code, and any
//! extraction that fails degrades to an empty set. Everything here is a pure
//! function of `(path, content)`.

use crate::tokenize::split_identifier;
use crate::types::{Chunk, CodePattern, DeclSpan, Domain, Framework, StructuralAttributes};
use regex::Regex;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Keyword tables — closed tag sets
// ---------------------------------------------------------------------------

const DOMAIN_KEYWORDS: &[(Domain, &[&str])] = &[
    (Domain::Authentication, &["auth", "login", "logout", "token", "session", "password", "oauth", "jwt", "credential"]),
    (Domain::Api, &["router", "endpoint", "request", "response", "handler", "fetch", "axios", "http", "restful"]),
    (Domain::Database, &["database", "query", "sql", "schema", "migration", "prisma", "repository", "orm", "mongoose"]),
    (Domain::Ui, &["component", "render", "props", "style", "css", "button", "modal", "layout", "theme"]),
    (Domain::Testing, &["describe(", "expect(", "assert", "mock", ".spec.", ".test.", "fixture"]),
    (Domain::Configuration, &["config", "settings", "env", "dotenv", "option"]),
    (Domain::Utility, &["util", "helper", "format", "parse", "convert", "sanitize"]),
];

const CONCEPT_KEYWORDS: &[(&str, &[&str])] = &[
    ("caching", &["cache", "memoize", "ttl"]),
    ("validation", &["validate", "validator", "sanitize", "zod", "joi"]),
    ("routing", &["route", "router", "redirect", "navigate"]),
    ("state-management", &["usestate", "reducer", "store", "redux", "zustand"]),
    ("error-handling", &["try", "catch", "throw", "error", "exception"]),
    ("serialization", &["serialize", "deserialize", "tojson", "stringify", "marshal"]),
    ("logging", &["logger", "logging", "console.log", "tracing"]),
    ("pagination", &["paginate", "pagination", "cursor", "offset", "page_size"]),
    ("concurrency", &["mutex", "atomic", "thread", "async", "await", "promise.all"]),
    ("search", &["search", "index", "rank", "relevance", "tokenize"]),
];

const BUSINESS_KEYWORDS: &[(&str, &[&str])] = &[
    ("payment", &["payment", "stripe", "checkout", "invoice"]),
    ("billing", &["billing", "subscription", "plan", "pricing"]),
    ("user-management", &["user", "profile", "account", "role", "permission"]),
    ("order", &["order", "cart", "shipment"]),
    ("inventory", &["inventory", "stock", "warehouse", "sku"]),
    ("notification", &["notification", "email", "sms", "webhook", "push"]),
    ("analytics", &["analytics", "metric", "tracking", "telemetry"]),
];

// ---------------------------------------------------------------------------
// Analyzer — compiled patterns, built once per engine
// ---------------------------------------------------------------------------

pub struct Analyzer {
    // JS/TS family
    js_function: Regex,
    js_arrow: Regex,
    js_class: Regex,
    js_interface: Regex,
    js_type: Regex,
    js_import: Regex,
    js_export_decl: Regex,
    js_export_clause: Regex,
    js_default_export: Regex,
    // Python
    py_def: Regex,
    py_class: Regex,
    py_import: Regex,
    // Rust
    rs_fn: Regex,
    rs_struct: Regex,
    rs_trait: Regex,
    rs_type: Regex,
    rs_use: Regex,
    // Go
    go_func: Regex,
    go_type: Regex,
    go_import: Regex,
    // Java / C#
    java_method: Regex,
    java_class: Regex,
    java_import: Regex,
    // Shared probes
    decision_tokens: Regex,
    ternary: Regex,
    type_annotation: Regex,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            js_function: Regex::new(r"(?m)^\s*(export\s+)?(default\s+)?(async\s+)?function\s*\*?\s*(\w+)\s*\(").unwrap(),
            js_arrow: Regex::new(r"(?m)^\s*(export\s+)?(?:const|let|var)\s+(\w+)\s*(?::[^=\n]+)?=\s*(async\s*)?(?:\([^)\n]*\)|\w+)\s*=>").unwrap(),
            js_class: Regex::new(r"(?m)^\s*(export\s+)?(default\s+)?(?:abstract\s+)?class\s+(\w+)").unwrap(),
            js_interface: Regex::new(r"(?m)^\s*(export\s+)?interface\s+(\w+)").unwrap(),
            js_type: Regex::new(r"(?m)^\s*(export\s+)?(?:type\s+(\w+)\s*=|enum\s+(\w+))").unwrap(),
            js_import: Regex::new(r#"(?:import\s+[^'"]*?from\s+['"]([^'"]+)['"]|import\s+['"]([^'"]+)['"]|require\s*\(\s*['"]([^'"]+)['"]\s*\))"#).unwrap(),
            js_export_decl: Regex::new(r"(?m)^\s*export\s+(?:default\s+)?(?:async\s+)?(?:function\s*\*?\s*|class\s+|interface\s+|type\s+|enum\s+|const\s+|let\s+|var\s+)(\w+)").unwrap(),
            js_export_clause: Regex::new(r"(?m)^\s*export\s*\{([^}]*)\}").unwrap(),
            js_default_export: Regex::new(r"(?m)^\s*export\s+default\b|module\.exports\s*=").unwrap(),
            py_def: Regex::new(r"(?m)^(\s*)(async\s+)?def\s+(\w+)\s*\(").unwrap(),
            py_class: Regex::new(r"(?m)^\s*class\s+(\w+)").unwrap(),
            py_import: Regex::new(r"(?m)^\s*(?:from\s+([\w.]+)\s+import|import\s+([\w.]+))").unwrap(),
            rs_fn: Regex::new(r"(?m)^\s*(pub(?:\([^)]*\))?\s+)?(async\s+)?fn\s+(\w+)").unwrap(),
            rs_struct: Regex::new(r"(?m)^\s*(pub(?:\([^)]*\))?\s+)?(?:struct|enum)\s+(\w+)").unwrap(),
            rs_trait: Regex::new(r"(?m)^\s*(pub(?:\([^)]*\))?\s+)?trait\s+(\w+)").unwrap(),
            rs_type: Regex::new(r"(?m)^\s*(pub(?:\([^)]*\))?\s+)?type\s+(\w+)").unwrap(),
            rs_use: Regex::new(r"(?m)^\s*use\s+([\w:]+)").unwrap(),
            go_func: Regex::new(r"(?m)^func\s+(?:\([^)]*\)\s+)?(\w+)\s*\(").unwrap(),
            go_type: Regex::new(r"(?m)^type\s+(\w+)\s+(struct|interface)\b").unwrap(),
            go_import: Regex::new(r#""([\w./-]+)""#).unwrap(),
            java_method: Regex::new(r"(?m)^\s*(?:public|protected|private)\s+(?:static\s+)?[\w<>,\[\]\s]+\s+(\w+)\s*\(").unwrap(),
            java_class: Regex::new(r"(?m)^\s*(?:public\s+)?(?:abstract\s+)?(?:class|interface|enum)\s+(\w+)").unwrap(),
            java_import: Regex::new(r"(?m)^\s*(?:import|using)\s+(?:static\s+)?([\w.]+)").unwrap(),
            decision_tokens: Regex::new(r"\b(if|while|for|switch|case|catch)\b|&&|\|\|").unwrap(),
            ternary: Regex::new(r"\?[^?.:]").unwrap(),
            type_annotation: Regex::new(r"\w\s*:\s*[A-Za-z_][\w<>\[\]., ]*|->\s*\w").unwrap(),
        }
    }

    /// Produce the structural attributes for one chunk.
    pub fn analyze(&self, chunk: &Chunk) -> StructuralAttributes {
        let content = chunk.content.as_str();
        let lower = content.to_lowercase();
        let path_lower = crate::types::display_path(&chunk.path).to_lowercase();

        let mut attrs = StructuralAttributes::default();

        self.extract_declarations(chunk, &mut attrs);
        self.extract_imports_exports(&chunk.language, content, &mut attrs);

        // Symbols: every declared name plus its split components.
        let decl_names: Vec<String> = attrs
            .functions
            .iter()
            .chain(&attrs.classes)
            .chain(&attrs.interfaces)
            .chain(&attrs.types)
            .map(|d| d.name.clone())
            .collect();
        for name in decl_names {
            for part in split_identifier(&name) {
                attrs.symbols.insert(part);
            }
            attrs.symbols.insert(name.to_lowercase());
        }

        attrs.domain = classify_domain(&lower, &path_lower);
        attrs.frameworks = detect_frameworks(&chunk.language, &lower, &attrs.imports);
        attrs.patterns = detect_patterns(&lower, &path_lower, &attrs);
        attrs.concepts = keyword_tags(CONCEPT_KEYWORDS, &lower);
        attrs.business_logic = keyword_tags(BUSINESS_KEYWORDS, &lower);

        attrs.complexity = self.complexity(content);
        attrs.quality = self.quality(&chunk.language, content, &attrs);
        attrs.importance = importance(&path_lower, content, &attrs);

        attrs
    }

    /// Decision-token count plus one.
    fn complexity(&self, content: &str) -> f64 {
        let decisions = self.decision_tokens.find_iter(content).count()
            + self.ternary.find_iter(content).count();
        (decisions + 1) as f64
    }

    /// Clamped sum of weighted quality indicators.
    fn quality(&self, language: &str, content: &str, attrs: &StructuralAttributes) -> f64 {
        let mut q: f64 = 0.0;

        if has_comment(language, content) {
            q += 0.20;
        }
        if matches!(language, "typescript" | "rust" | "python")
            && self.type_annotation.is_match(content)
        {
            q += 0.15;
        }
        if attrs.has_default_export {
            q += 0.15;
        } else if !attrs.exports.is_empty() {
            q += 0.10;
        }
        if content.contains("try") && content.contains("catch") {
            q += 0.10;
        }

        let line_count = content.lines().count();
        if (5..=100).contains(&line_count) {
            q += 0.10;
        } else if line_count > 200 {
            q -= 0.10;
        }
        if content.trim().len() < 50 {
            q -= 0.20;
        }

        q.clamp(0.0, 1.0)
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn extract_declarations(&self, chunk: &Chunk, attrs: &mut StructuralAttributes) {
        let content = chunk.content.as_str();
        match chunk.language.as_str() {
            "javascript" | "typescript" | "vue" | "svelte" => {
                for cap in self.js_function.captures_iter(content) {
                    if let Some(name) = cap.get(4) {
                        attrs.functions.push(self.span_for(chunk, name.start(), name.as_str(), cap.get(1).is_some(), cap.get(3).is_some()));
                    }
                }
                for cap in self.js_arrow.captures_iter(content) {
                    if let Some(name) = cap.get(2) {
                        attrs.functions.push(self.span_for(chunk, name.start(), name.as_str(), cap.get(1).is_some(), cap.get(3).is_some()));
                    }
                }
                for cap in self.js_class.captures_iter(content) {
                    if let Some(name) = cap.get(3) {
                        attrs.classes.push(self.span_for(chunk, name.start(), name.as_str(), cap.get(1).is_some(), false));
                    }
                }
                for cap in self.js_interface.captures_iter(content) {
                    if let Some(name) = cap.get(2) {
                        attrs.interfaces.push(self.span_for(chunk, name.start(), name.as_str(), cap.get(1).is_some(), false));
                    }
                }
                for cap in self.js_type.captures_iter(content) {
                    if let Some(name) = cap.get(2).or_else(|| cap.get(3)) {
                        attrs.types.push(self.span_for(chunk, name.start(), name.as_str(), cap.get(1).is_some(), false));
                    }
                }
            }
            "python" => {
                for cap in self.py_def.captures_iter(content) {
                    if let Some(name) = cap.get(3) {
                        attrs.functions.push(self.span_for(chunk, name.start(), name.as_str(), false, cap.get(2).is_some()));
                    }
                }
                for cap in self.py_class.captures_iter(content) {
                    if let Some(name) = cap.get(1) {
                        attrs.classes.push(self.span_for(chunk, name.start(), name.as_str(), false, false));
                    }
                }
            }
            "rust" => {
                for cap in self.rs_fn.captures_iter(content) {
                    if let Some(name) = cap.get(3) {
                        attrs.functions.push(self.span_for(chunk, name.start(), name.as_str(), cap.get(1).is_some(), cap.get(2).is_some()));
                    }
                }
                for cap in self.rs_struct.captures_iter(content) {
                    if let Some(name) = cap.get(2) {
                        attrs.classes.push(self.span_for(chunk, name.start(), name.as_str(), cap.get(1).is_some(), false));
                    }
                }
                for cap in self.rs_trait.captures_iter(content) {
                    if let Some(name) = cap.get(2) {
                        attrs.interfaces.push(self.span_for(chunk, name.start(), name.as_str(), cap.get(1).is_some(), false));
                    }
                }
                for cap in self.rs_type.captures_iter(content) {
                    if let Some(name) = cap.get(2) {
                        attrs.types.push(self.span_for(chunk, name.start(), name.as_str(), cap.get(1).is_some(), false));
                    }
                }
            }
            "go" => {
                for cap in self.go_func.captures_iter(content) {
                    if let Some(name) = cap.get(1) {
                        let exported = name.as_str().chars().next().is_some_and(|c| c.is_uppercase());
                        attrs.functions.push(self.span_for(chunk, name.start(), name.as_str(), exported, false));
                    }
                }
                for cap in self.go_type.captures_iter(content) {
                    if let (Some(name), Some(kind)) = (cap.get(1), cap.get(2)) {
                        let exported = name.as_str().chars().next().is_some_and(|c| c.is_uppercase());
                        let span = self.span_for(chunk, name.start(), name.as_str(), exported, false);
                        if kind.as_str() == "interface" {
                            attrs.interfaces.push(span);
                        } else {
                            attrs.classes.push(span);
                        }
                    }
                }
            }
            "java" | "csharp" | "kotlin" | "scala" | "swift" | "php" => {
                for cap in self.java_method.captures_iter(content) {
                    if let Some(name) = cap.get(1) {
                        attrs.functions.push(self.span_for(chunk, name.start(), name.as_str(), true, false));
                    }
                }
                for cap in self.java_class.captures_iter(content) {
                    if let Some(name) = cap.get(1) {
                        attrs.classes.push(self.span_for(chunk, name.start(), name.as_str(), true, false));
                    }
                }
            }
            _ => {}
        }
    }

    /// Build a [`DeclSpan`] at a byte offset within the chunk, with a brace
    /// (or indent, for Python) heuristic for the end line. File coordinates.
    fn span_for(
        &self,
        chunk: &Chunk,
        byte_offset: usize,
        name: &str,
        exported: bool,
        is_async: bool,
    ) -> DeclSpan {
        let local_line = chunk.content[..byte_offset].matches('\n').count();
        let end_local = if chunk.language == "python" {
            python_block_end(&chunk.content, local_line)
        } else {
            brace_block_end(&chunk.content, local_line)
        };
        DeclSpan {
            name: name.to_string(),
            start_line: chunk.start_line + local_line,
            end_line: chunk.start_line + end_local,
            exported,
            is_async,
        }
    }

    // -----------------------------------------------------------------------
    // Imports / exports
    // -----------------------------------------------------------------------

    fn extract_imports_exports(&self, language: &str, content: &str, attrs: &mut StructuralAttributes) {
        match language {
            "javascript" | "typescript" | "vue" | "svelte" => {
                for cap in self.js_import.captures_iter(content) {
                    if let Some(m) = cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3)) {
                        attrs.imports.insert(m.as_str().to_string());
                    }
                }
                for cap in self.js_export_decl.captures_iter(content) {
                    if let Some(name) = cap.get(1) {
                        attrs.exports.insert(name.as_str().to_string());
                    }
                }
                for cap in self.js_export_clause.captures_iter(content) {
                    if let Some(clause) = cap.get(1) {
                        for name in clause.as_str().split(',') {
                            // `foo as bar` exports `bar`
                            let name = name.split_whitespace().last().unwrap_or("").trim();
                            if !name.is_empty() && name != "as" {
                                attrs.exports.insert(name.to_string());
                            }
                        }
                    }
                }
                attrs.has_default_export = self.js_default_export.is_match(content);
            }
            "python" => {
                for cap in self.py_import.captures_iter(content) {
                    if let Some(m) = cap.get(1).or_else(|| cap.get(2)) {
                        attrs.imports.insert(m.as_str().to_string());
                    }
                }
            }
            "rust" => {
                for cap in self.rs_use.captures_iter(content) {
                    if let Some(m) = cap.get(1) {
                        // Top path segment only — `std::fs` imports `std`.
                        let top = m.as_str().split("::").next().unwrap_or("");
                        if !top.is_empty() {
                            attrs.imports.insert(top.to_string());
                        }
                    }
                }
                for decl in attrs.functions.iter().chain(&attrs.classes).chain(&attrs.interfaces).chain(&attrs.types) {
                    if decl.exported {
                        attrs.exports.insert(decl.name.clone());
                    }
                }
            }
            "go" => {
                if content.contains("import") {
                    for cap in self.go_import.captures_iter(content) {
                        if let Some(m) = cap.get(1) {
                            attrs.imports.insert(m.as_str().to_string());
                        }
                    }
                }
                for decl in attrs.functions.iter().chain(&attrs.classes).chain(&attrs.interfaces) {
                    if decl.exported {
                        attrs.exports.insert(decl.name.clone());
                    }
                }
            }
            "java" | "csharp" | "kotlin" | "scala" => {
                for cap in self.java_import.captures_iter(content) {
                    if let Some(m) = cap.get(1) {
                        attrs.imports.insert(m.as_str().to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Block-end heuristics
// ---------------------------------------------------------------------------

/// Scan forward from `start_line` (0-based, chunk-local) balancing braces.
/// Returns the 0-based line where depth returns to zero, or the chunk's last
/// line when the block is cut off by the window.
fn brace_block_end(content: &str, start_line: usize) -> usize {
    let lines: Vec<&str> = content.lines().collect();
    let mut depth = 0i32;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start_line) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return i;
        }
    }
    lines.len().saturating_sub(1)
}

/// Python: the block ends before the first subsequent non-blank line whose
/// indent is not deeper than the `def`/`class` line.
fn python_block_end(content: &str, start_line: usize) -> usize {
    let lines: Vec<&str> = content.lines().collect();
    let base_indent = lines
        .get(start_line)
        .map(|l| l.len() - l.trim_start().len())
        .unwrap_or(0);
    let mut last = start_line;
    for (i, line) in lines.iter().enumerate().skip(start_line + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        if indent <= base_indent {
            return last;
        }
        last = i;
    }
    lines.len().saturating_sub(1)
}

// ---------------------------------------------------------------------------
// Tag classification
// ---------------------------------------------------------------------------

fn classify_domain(lower: &str, path_lower: &str) -> Domain {
    let mut best = Domain::General;
    let mut best_score = 0usize;
    for (domain, keywords) in DOMAIN_KEYWORDS {
        let mut score = 0;
        for kw in *keywords {
            score += lower.matches(kw).count();
            if path_lower.contains(kw) {
                score += 3;
            }
        }
        if score > best_score {
            best = *domain;
            best_score = score;
        }
    }
    best
}

fn detect_frameworks(language: &str, lower: &str, imports: &BTreeSet<String>) -> BTreeSet<Framework> {
    let mut out = BTreeSet::new();
    let import_str = imports.iter().cloned().collect::<Vec<_>>().join(" ").to_lowercase();
    let probe = |needle: &str| lower.contains(needle) || import_str.contains(needle);

    if probe("react") || lower.contains("usestate(") || lower.contains("useeffect(") {
        out.insert(Framework::React);
    }
    if probe("next/") || probe("next.js") || probe("getserversideprops") {
        out.insert(Framework::Nextjs);
    }
    if probe("vue") {
        out.insert(Framework::Vue);
    }
    if probe("svelte") {
        out.insert(Framework::Svelte);
    }
    if probe("@angular") {
        out.insert(Framework::Angular);
    }
    if probe("express") {
        out.insert(Framework::Express);
    }
    if probe("@nestjs") {
        out.insert(Framework::Nestjs);
    }
    if probe("django") {
        out.insert(Framework::Django);
    }
    if probe("flask") {
        out.insert(Framework::Flask);
    }
    if probe("springframework") || probe("spring boot") {
        out.insert(Framework::Spring);
    }
    if probe("rails") {
        out.insert(Framework::Rails);
    }
    if language == "typescript" {
        out.insert(Framework::Typescript);
    }
    if probe("tailwind") {
        out.insert(Framework::Tailwind);
    }
    if probe("prisma") {
        out.insert(Framework::Prisma);
    }
    if probe("graphql") {
        out.insert(Framework::Graphql);
    }
    out
}

fn detect_patterns(
    lower: &str,
    path_lower: &str,
    attrs: &StructuralAttributes,
) -> BTreeSet<CodePattern> {
    let mut out = BTreeSet::new();

    if attrs.frameworks.contains(&Framework::React)
        && attrs.functions.iter().any(|f| f.name.chars().next().is_some_and(|c| c.is_uppercase()))
    {
        out.insert(CodePattern::Component);
    }
    if attrs.functions.iter().any(|f| {
        f.name.starts_with("use") && f.name.chars().nth(3).is_some_and(|c| c.is_uppercase())
    }) {
        out.insert(CodePattern::Hook);
    }
    let path_or_body = |needle: &str| path_lower.contains(needle) || lower.contains(needle);
    if path_or_body("service") {
        out.insert(CodePattern::Service);
    }
    if path_or_body("middleware") {
        out.insert(CodePattern::Middleware);
    }
    if path_or_body("repository") || path_or_body("repositories") {
        out.insert(CodePattern::Repository);
    }
    if path_or_body("factory") {
        out.insert(CodePattern::Factory);
    }
    if lower.contains("getinstance") || lower.contains("instance()") {
        out.insert(CodePattern::Singleton);
    }
    if lower.contains("subscribe") || lower.contains("addeventlistener") || lower.contains("observer") {
        out.insert(CodePattern::Observer);
    }
    if path_or_body("controller") {
        out.insert(CodePattern::Controller);
    }
    if path_lower.contains("model") || lower.contains("schema.") {
        out.insert(CodePattern::Model);
    }
    if path_lower.contains("route") || path_lower.contains("/api/") {
        out.insert(CodePattern::Route);
    }
    if path_lower.contains("migration") {
        out.insert(CodePattern::Migration);
    }
    if path_lower.contains(".test.") || path_lower.contains(".spec.") || path_lower.contains("__tests__") {
        out.insert(CodePattern::Test);
    }
    if path_lower.contains("util") || path_lower.contains("helper") {
        out.insert(CodePattern::Util);
    }
    out
}

fn keyword_tags(table: &[(&'static str, &[&str])], lower: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for (tag, keywords) in table {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            out.insert((*tag).to_string());
        }
    }
    out
}

fn has_comment(language: &str, content: &str) -> bool {
    match language {
        "python" | "ruby" | "shell" | "yaml" | "toml" | "ini" | "dockerfile" | "makefile" => {
            content.lines().any(|l| l.trim_start().starts_with('#'))
        }
        _ => content.contains("//") || content.contains("/*"),
    }
}

// ---------------------------------------------------------------------------
// Importance — shared by the analyzer and the ranker's file weight
// ---------------------------------------------------------------------------

/// Per-path-bucket multiplier. Boosts api/components/pages/lib/utils/hooks,
/// penalizes tests, generated code, and declaration files; paths deeper than
/// five segments decay linearly toward 0.5.
pub fn path_bucket_multiplier(path_lower: &str) -> f64 {
    let mut m = 1.0;
    if path_lower.contains("/api/") || path_lower.starts_with("api/") {
        m *= 1.5;
    }
    if path_lower.contains("component") {
        m *= 1.4;
    }
    if path_lower.contains("/pages/") || path_lower.contains("/app/") {
        m *= 1.3;
    }
    if path_lower.contains("/lib/") {
        m *= 1.3;
    }
    if path_lower.contains("/hooks/") {
        m *= 1.3;
    }
    if path_lower.contains("util") {
        m *= 1.2;
    }
    if path_lower.contains(".test.")
        || path_lower.contains(".spec.")
        || path_lower.contains("__tests__")
        || path_lower.contains("/tests/")
    {
        m *= 0.5;
    }
    if path_lower.contains("generated") || path_lower.contains(".gen.") {
        m *= 0.4;
    }
    if path_lower.ends_with(".d.ts") {
        m *= 0.3;
    }

    let depth = path_lower.matches('/').count();
    if depth > 5 {
        // Linear decay, floored at 0.5 by depth 10.
        let decay = 1.0 - 0.1 * (depth - 5) as f64;
        m *= decay.max(0.5);
    }
    m
}

fn importance(path_lower: &str, content: &str, attrs: &StructuralAttributes) -> f64 {
    let mut m = path_bucket_multiplier(path_lower);

    if attrs.has_default_export {
        m *= 1.3;
    } else if !attrs.exports.is_empty() {
        m *= 1.2;
    }
    let line_count = content.lines().count();
    if (5..=100).contains(&line_count) {
        m *= 1.1;
    } else if line_count > 200 {
        m *= 0.9;
    }

    m.clamp(0.1, 5.0)
}
