//! Path walker and filter.
//!
//! Enumerates candidate files under the configured roots, applying the
//! built-in ignore set, extension→language mapping, and the size cap. Output
//! is deterministic for a given filesystem snapshot: deduplicated across
//! roots and sorted byte-wise by absolute path.

use crate::types::{display_path, language_for_ext, FileInfo, IndexConfig, DEFAULT_IGNORE_GLOBS};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::warn;

/// Compile the ignore set: the unconditional defaults plus any configured
/// extras. Shared by the walker and the watcher's event filter so both
/// enforce the same exclusions.
pub fn build_ignore_set(extra: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in DEFAULT_IGNORE_GLOBS.iter().copied().map(str::to_string).chain(extra.iter().cloned()) {
        // Patterns match both at the root and at any depth.
        for candidate in [pattern.clone(), format!("**/{pattern}")] {
            match Glob::new(&candidate) {
                Ok(g) => {
                    builder.add(g);
                }
                Err(e) => warn!(pattern = candidate.as_str(), error = %e, "Skipping bad ignore glob"),
            }
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

/// True if `path` (relative to a root) is excluded by the ignore set.
pub fn is_ignored(ignore_set: &GlobSet, rel_path: &str) -> bool {
    ignore_set.is_match(rel_path)
}

/// Decide whether one file is indexable under the given config, returning
/// its [`FileInfo`] when it is. `None` means: unrecognized extension,
/// ignored path, oversized, inside the index directory, or unreadable
/// metadata. This is the single filter both the walker and the watcher use.
pub fn file_info_for(
    config: &IndexConfig,
    ignore_set: &GlobSet,
    abs_path: &Path,
) -> Option<FileInfo> {
    if abs_path.starts_with(&config.index_dir) {
        return None;
    }

    let ext = file_extension(abs_path)?;
    let language = language_for_ext(&ext)?;

    let rel = relative_to_roots(config, abs_path);
    if is_ignored(ignore_set, &rel) {
        return None;
    }

    let meta = std::fs::metadata(abs_path).ok()?;
    if !meta.is_file() || meta.len() > config.max_file_size {
        return None;
    }
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Some(FileInfo { path: abs_path.to_path_buf(), size: meta.len(), mtime, language })
}

/// Walk all configured roots and return the candidate files, sorted by
/// absolute path and deduplicated across overlapping roots. Unreadable
/// directories produce a warning and are skipped.
pub fn walk_roots(config: &IndexConfig, ignore_set: &GlobSet) -> Vec<FileInfo> {
    // BTreeMap gives dedup-by-path and byte-wise ordering in one pass.
    let mut files: BTreeMap<PathBuf, FileInfo> = BTreeMap::new();

    for root in &config.roots {
        if !root.is_dir() {
            warn!(root = %root.display(), "Root is not a directory, skipping");
            continue;
        }

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "Walk error, skipping entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            if let Some(info) = file_info_for(config, ignore_set, entry.path()) {
                files.insert(info.path.clone(), info);
            }
        }
    }

    files.into_values().collect()
}

/// The extension used for language mapping. Extensionless `Dockerfile` and
/// `Makefile` map through their file names.
fn file_extension(path: &Path) -> Option<String> {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        return Some(ext.to_ascii_lowercase());
    }
    let name = path.file_name()?.to_str()?.to_ascii_lowercase();
    matches!(name.as_str(), "dockerfile" | "makefile").then_some(name)
}

/// Path relative to the first containing root, forward-slashed. Falls back
/// to the absolute form when no root contains it (watcher events racing a
/// config change).
pub fn relative_to_roots(config: &IndexConfig, abs_path: &Path) -> String {
    for root in &config.roots {
        if let Ok(rel) = abs_path.strip_prefix(root) {
            return display_path(rel);
        }
    }
    display_path(abs_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexConfig;
    use std::fs;

    fn config_for(root: &Path) -> IndexConfig {
        IndexConfig::default_for(vec![root.to_path_buf()])
    }

    #[test]
    fn walks_recognized_extensions_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const x = 1;\n").unwrap();
        fs::write(dir.path().join("b.bin"), [0u8, 1, 2]).unwrap();

        let config = config_for(dir.path());
        let ignore = build_ignore_set(&config.extra_ignores);
        let files = walk_roots(&config, &ignore);

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("a.ts"));
        assert_eq!(files[0].language, "typescript");
    }

    #[test]
    fn skips_node_modules_and_declaration_files() {
        let dir = tempfile::tempdir().unwrap();
        let nm = dir.path().join("node_modules").join("pkg");
        fs::create_dir_all(&nm).unwrap();
        fs::write(nm.join("x.ts"), "const __ignored_marker__ = 1;\n").unwrap();
        fs::write(dir.path().join("types.d.ts"), "export type A = string;\n").unwrap();
        fs::write(dir.path().join("keep.ts"), "export const keep = 1;\n").unwrap();

        let config = config_for(dir.path());
        let ignore = build_ignore_set(&config.extra_ignores);
        let files = walk_roots(&config, &ignore);

        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("keep.ts"));
    }

    #[test]
    fn skips_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big.ts"), "x".repeat(64)).unwrap();

        let mut config = config_for(dir.path());
        config.max_file_size = 10;
        let ignore = build_ignore_set(&config.extra_ignores);
        assert!(walk_roots(&config, &ignore).is_empty());
    }

    #[test]
    fn refuses_index_directory() {
        let dir = tempfile::tempdir().unwrap();
        let idx = dir.path().join("ultra-fast-index");
        fs::create_dir_all(&idx).unwrap();
        fs::write(idx.join("stale.json"), "{}").unwrap();
        fs::write(dir.path().join("a.ts"), "const a = 1;\n").unwrap();

        let config = config_for(dir.path());
        let ignore = build_ignore_set(&config.extra_ignores);
        let files = walk_roots(&config, &ignore);
        assert!(files.iter().all(|f| !f.path.starts_with(&config.index_dir)));
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.ts"), "const b = 1;\n").unwrap();
        fs::write(dir.path().join("a.ts"), "const a = 1;\n").unwrap();

        // Same root listed twice must not duplicate entries.
        let mut config = config_for(dir.path());
        config.roots.push(dir.path().to_path_buf());
        let ignore = build_ignore_set(&config.extra_ignores);
        let files = walk_roots(&config, &ignore);

        assert_eq!(files.len(), 2);
        assert!(files[0].path < files[1].path);
    }
}
