use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Constants — lexical defaults
// ---------------------------------------------------------------------------

/// Default chunk window in lines.
pub const DEFAULT_CHUNK_LINES: usize = 30;

/// Default overlap between consecutive chunks, in lines.
pub const DEFAULT_CHUNK_OVERLAP: usize = 0;

/// Largest overlap the structural flow may request.
pub const MAX_CHUNK_OVERLAP: usize = 100;

/// Maximum file size (in bytes) that will be read into memory.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Default name of the index directory under the first project root.
pub const DEFAULT_INDEX_DIR: &str = "ultra-fast-index";

/// Name of the snapshot file inside the index directory.
pub const SNAPSHOT_FILE: &str = "index.json";

/// Upper bound on pipeline worker threads.
pub const MAX_WORKERS: usize = 64;

/// Glob patterns that are never indexed, regardless of configuration.
pub const DEFAULT_IGNORE_GLOBS: &[&str] = &[
    "node_modules/**",
    "bower_components/**",
    "vendor/**",
    ".git/**",
    ".svn/**",
    ".hg/**",
    "dist/**",
    "build/**",
    "out/**",
    ".next/**",
    ".nuxt/**",
    ".cache/**",
    "coverage/**",
    ".vscode/**",
    ".idea/**",
    "*.min.js",
    "*.min.css",
    "*.map",
    "*.d.ts",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "*.log",
    "*.env*",
];

/// Map a file extension (lowercase, without dot) to its language tag.
/// Returns `None` for unrecognized extensions — those files are skipped.
pub fn language_for_ext(ext: &str) -> Option<&'static str> {
    let lang = match ext {
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "vue" => "vue",
        "svelte" => "svelte",
        "py" => "python",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "go" => "go",
        "rs" => "rust",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "css" | "scss" | "sass" | "less" => "css",
        "html" => "html",
        "xml" => "xml",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "ini" => "ini",
        "md" => "markdown",
        "sql" => "sql",
        "graphql" => "graphql",
        "sh" | "bash" | "zsh" => "shell",
        "ps1" => "powershell",
        "dockerfile" => "dockerfile",
        "makefile" => "makefile",
        _ => return None,
    };
    Some(lang)
}

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

/// Runtime configuration for an engine instance.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// Project roots to index, absolute.
    pub roots: Vec<PathBuf>,
    /// Directory the snapshot is written to, absolute.
    pub index_dir: PathBuf,
    /// Chunk window in lines.
    pub chunk_lines: usize,
    /// Overlap between consecutive chunk windows, in lines.
    pub chunk_overlap: usize,
    /// Files larger than this are skipped.
    pub max_file_size: u64,
    /// Extra ignore globs on top of [`DEFAULT_IGNORE_GLOBS`].
    pub extra_ignores: Vec<String>,
    /// Whether the watcher starts automatically after a full index.
    pub watch: bool,
}

impl IndexConfig {
    /// Lexical-flow defaults for a set of roots, with the index directory
    /// placed under the first root.
    pub fn default_for(roots: Vec<PathBuf>) -> Self {
        let index_dir = roots
            .first()
            .map(|r| r.join(DEFAULT_INDEX_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_DIR));
        Self {
            roots,
            index_dir,
            chunk_lines: DEFAULT_CHUNK_LINES,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            max_file_size: MAX_FILE_SIZE,
            extra_ignores: Vec::new(),
            watch: true,
        }
    }
}

// ---------------------------------------------------------------------------
// File pipeline types
// ---------------------------------------------------------------------------

/// A candidate file produced by the walker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: u64,
    pub language: &'static str,
}

/// Stable identifier of one chunk, derived from `(path, chunk_index,
/// content_hash)`. Byte-identical across runs over unchanged input.
pub type ChunkId = String;

/// An indexable span of a single file. Immutable after creation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    pub path: PathBuf,
    pub language: String,
    /// 0-based, contiguous within a file.
    pub chunk_index: usize,
    /// 1-based, inclusive. `start_line <= end_line` always holds.
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    /// Hex SHA-256 of `content`.
    pub content_hash: String,
    /// The file's mtime at ingest, seconds since the Unix epoch.
    pub file_mtime: u64,
}

// ---------------------------------------------------------------------------
// Structural attributes — closed tag sets
// ---------------------------------------------------------------------------

/// Coarse functional domain of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Api,
    Authentication,
    Database,
    Ui,
    Utility,
    Configuration,
    Testing,
    General,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Api => "api",
            Domain::Authentication => "authentication",
            Domain::Database => "database",
            Domain::Ui => "ui",
            Domain::Utility => "utility",
            Domain::Configuration => "configuration",
            Domain::Testing => "testing",
            Domain::General => "general",
        }
    }
}

/// Framework tags detectable from imports and content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Nextjs,
    Vue,
    Svelte,
    Angular,
    Express,
    Nestjs,
    Django,
    Flask,
    Spring,
    Rails,
    Typescript,
    Tailwind,
    Prisma,
    Graphql,
}

impl Framework {
    pub fn as_str(self) -> &'static str {
        match self {
            Framework::React => "react",
            Framework::Nextjs => "nextjs",
            Framework::Vue => "vue",
            Framework::Svelte => "svelte",
            Framework::Angular => "angular",
            Framework::Express => "express",
            Framework::Nestjs => "nestjs",
            Framework::Django => "django",
            Framework::Flask => "flask",
            Framework::Spring => "spring",
            Framework::Rails => "rails",
            Framework::Typescript => "typescript",
            Framework::Tailwind => "tailwind",
            Framework::Prisma => "prisma",
            Framework::Graphql => "graphql",
        }
    }
}

/// Structural code pattern tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodePattern {
    Component,
    Hook,
    Service,
    Middleware,
    Repository,
    Factory,
    Singleton,
    Observer,
    Controller,
    Model,
    Route,
    Migration,
    Test,
    Util,
}

impl CodePattern {
    pub fn as_str(self) -> &'static str {
        match self {
            CodePattern::Component => "component",
            CodePattern::Hook => "hook",
            CodePattern::Service => "service",
            CodePattern::Middleware => "middleware",
            CodePattern::Repository => "repository",
            CodePattern::Factory => "factory",
            CodePattern::Singleton => "singleton",
            CodePattern::Observer => "observer",
            CodePattern::Controller => "controller",
            CodePattern::Model => "model",
            CodePattern::Route => "route",
            CodePattern::Migration => "migration",
            CodePattern::Test => "test",
            CodePattern::Util => "util",
        }
    }
}

/// A named declaration with its line span inside a chunk.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclSpan {
    pub name: String,
    /// 1-based file line where the declaration starts.
    pub start_line: usize,
    /// 1-based file line where the declaration body ends (heuristic).
    pub end_line: usize,
    pub exported: bool,
    pub is_async: bool,
}

/// Derived attributes of a chunk. Reproducible from `(path, content)` alone.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuralAttributes {
    /// Tokenized identifier names appearing as definitions.
    pub symbols: BTreeSet<String>,
    pub functions: Vec<DeclSpan>,
    pub classes: Vec<DeclSpan>,
    pub interfaces: Vec<DeclSpan>,
    pub types: Vec<DeclSpan>,
    /// Imported module names.
    pub imports: BTreeSet<String>,
    /// Exported symbol names.
    pub exports: BTreeSet<String>,
    pub domain: Domain,
    pub frameworks: BTreeSet<Framework>,
    pub patterns: BTreeSet<CodePattern>,
    pub concepts: BTreeSet<String>,
    pub business_logic: BTreeSet<String>,
    /// Decision-token count plus one.
    pub complexity: f64,
    /// Heuristic content quality in `[0, 1]`.
    pub quality: f64,
    /// Per-path and per-content multiplier product, in `[0.1, 5.0]`.
    pub importance: f64,
    pub has_default_export: bool,
}

impl Default for Domain {
    fn default() -> Self {
        Domain::General
    }
}

// ---------------------------------------------------------------------------
// Search types
// ---------------------------------------------------------------------------

/// Ranker options. `Default` matches the lexical flow.
#[derive(Clone, Debug)]
pub struct SearchOptions {
    pub max_results: usize,
    pub min_score: f64,
    pub enable_clustering: bool,
    pub fuzzy: bool,
    pub code_specific_ranking: bool,
    /// Enables the richer variant path (cap 15 instead of 5).
    pub semantic_expansion: bool,
    /// Restrict results to this language tag.
    pub language: Option<String>,
    /// Restrict results to paths containing this substring.
    pub file_path: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            min_score: 0.0,
            enable_clustering: true,
            fuzzy: true,
            code_specific_ranking: true,
            semantic_expansion: false,
            language: None,
            file_path: None,
        }
    }
}

/// One ranked search hit.
#[derive(Clone, Debug, Serialize)]
pub struct SearchResult {
    pub chunk_id: ChunkId,
    pub path: PathBuf,
    pub language: String,
    pub start_line: usize,
    pub end_line: usize,
    pub score: f64,
    /// `score` squashed into `[0, 1]`; same ordering as `score`.
    pub relevance: f64,
    /// Which signals contributed, for display.
    pub explanation: String,
    /// Chunk body, present unless the caller asked for paths only.
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Stats and reports
// ---------------------------------------------------------------------------

/// Aggregate index statistics.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct IndexStats {
    pub total_files: usize,
    pub total_chunks: usize,
    pub distinct_terms: usize,
    pub mean_terms_per_chunk: f64,
    pub watching: bool,
    pub roots: Vec<PathBuf>,
}

/// Outcome of one indexing run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IndexReport {
    pub completed: bool,
    pub files_indexed: usize,
    pub chunks_indexed: usize,
    pub elapsed_ms: u64,
    /// Per-file recoverable errors (IO, oversized, unreadable).
    pub errors: Vec<String>,
}

/// Normalize a path for display and for relative-glob matching: forward
/// slashes regardless of platform.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
