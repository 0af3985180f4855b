//! Engine facade.
//!
//! The single object the CLI and RPC layers talk to. Owns the chunk store,
//! the structural-attributes map, and the inverted index behind one
//! read-write lock; the query processor and ranker borrow them read-only.
//! File reading, chunking, analysis, and tokenization fan out across a
//! bounded rayon pool; table updates are applied by the single caller
//! thread, one file at a time, so every observable state sits on a file
//! boundary.

use crate::analyze::Analyzer;
use crate::chunk::chunk_file;
use crate::error::EngineError;
use crate::index::InvertedIndex;
use crate::query::{ProcessedQuery, QueryProcessor, MAX_VARIANTS_EXPANDED, MAX_VARIANTS_LEXICAL};
use crate::rank::{NoopReranker, Ranker, Reranker};
use crate::snapshot;
use crate::tokenize::TermExtractor;
use crate::types::{
    display_path, Chunk, ChunkId, FileInfo, IndexConfig, IndexReport, IndexStats, SearchOptions,
    SearchResult, StructuralAttributes, MAX_CHUNK_OVERLAP, MAX_WORKERS,
};
use crate::walk::{build_ignore_set, file_info_for, walk_roots};
use crate::watch::{FileWatcher, FsEvent, FsEventKind, WatchState};
use globset::GlobSet;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Quiet period between a watcher-driven update and the snapshot write.
const SAVE_COALESCE_MS: u64 = 1000;

// ---------------------------------------------------------------------------
// Core state — everything behind the lock moves together
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EngineState {
    chunks: HashMap<ChunkId, Chunk>,
    by_path: HashMap<PathBuf, Vec<ChunkId>>,
    attrs: HashMap<ChunkId, StructuralAttributes>,
    index: InvertedIndex,
}

impl EngineState {
    fn remove_path(&mut self, path: &Path) -> usize {
        let Some(ids) = self.by_path.remove(path) else { return 0 };
        self.index.remove_chunks(&ids);
        for id in &ids {
            self.chunks.remove(id);
            self.attrs.remove(id);
        }
        ids.len()
    }

    fn insert_record(&mut self, record: FileRecord) -> Result<usize, EngineError> {
        let mut ids = Vec::with_capacity(record.entries.len());
        for entry in record.entries {
            self.index.add(&entry.chunk.id, &entry.terms)?;
            ids.push(entry.chunk.id.clone());
            self.attrs.insert(entry.chunk.id.clone(), entry.attrs);
            self.chunks.insert(entry.chunk.id.clone(), entry.chunk);
        }
        let count = ids.len();
        self.by_path.insert(record.path, ids);
        Ok(count)
    }
}

/// Per-file pipeline output, produced in parallel and applied sequentially.
struct FileRecord {
    path: PathBuf,
    entries: Vec<RecordEntry>,
}

struct RecordEntry {
    chunk: Chunk,
    attrs: StructuralAttributes,
    terms: HashMap<String, u32>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    config: IndexConfig,
    ignore_set: GlobSet,
    analyzer: Analyzer,
    extractor: TermExtractor,
    queries: QueryProcessor,
    reranker: Box<dyn Reranker>,
    pool: rayon::ThreadPool,
    state: RwLock<EngineState>,
    /// Set when an index invariant trips; mutations refuse until `clear`.
    read_only: AtomicBool,
    /// Set by incremental updates; cleared by the coalescing saver.
    dirty: Arc<AtomicBool>,
    watcher: Mutex<FileWatcher>,
    saver_shutdown: Arc<AtomicBool>,
}

impl Engine {
    /// Validate the configuration, load any existing snapshot, and return a
    /// ready engine. A corrupt snapshot logs loudly and yields empty state.
    pub fn new(mut config: IndexConfig) -> Result<Arc<Self>, EngineError> {
        if config.roots.is_empty() {
            return Err(EngineError::Config("at least one project root is required".into()));
        }
        for root in &mut config.roots {
            *root = root
                .canonicalize()
                .map_err(|_| EngineError::Config(format!("root not found: {}", root.display())))?;
            if !root.is_dir() {
                return Err(EngineError::Config(format!(
                    "root is not a directory: {}",
                    root.display()
                )));
            }
        }
        if config.chunk_lines == 0 {
            return Err(EngineError::Config("chunk window must be at least one line".into()));
        }
        if config.chunk_overlap > MAX_CHUNK_OVERLAP || config.chunk_overlap >= config.chunk_lines {
            return Err(EngineError::Config(format!(
                "chunk overlap {} out of range (max {MAX_CHUNK_OVERLAP}, must be under the window)",
                config.chunk_overlap
            )));
        }

        // Resolve the index directory the same way the walker sees paths,
        // and ignore it explicitly when it sits under a root. The engine
        // must never index or watch its own snapshots.
        if let (Some(parent), Some(name)) = (config.index_dir.parent(), config.index_dir.file_name())
        {
            if let Ok(parent) = parent.canonicalize() {
                config.index_dir = parent.join(name);
            }
        }
        for root in &config.roots {
            if let Ok(rel) = config.index_dir.strip_prefix(root) {
                config.extra_ignores.push(format!("{}/**", display_path(rel)));
            }
        }

        let ignore_set = build_ignore_set(&config.extra_ignores);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(MAX_WORKERS))
            .build()
            .map_err(|e| EngineError::Config(format!("worker pool: {e}")))?;

        let mut state = EngineState::default();
        if let Some(snap) = snapshot::load_or_empty(&config.index_dir) {
            for chunk in snap.chunks {
                state.by_path.entry(chunk.path.clone()).or_default().push(chunk.id.clone());
                state.chunks.insert(chunk.id.clone(), chunk);
            }
            // Chunk order within a file follows chunk_index.
            for ids in state.by_path.values_mut() {
                ids.sort_by_key(|id| state.chunks.get(id).map(|c| c.chunk_index).unwrap_or(0));
            }
            state.attrs = snap.attributes;
            state.index = snap.index;
            info!(
                chunks = state.chunks.len(),
                files = state.by_path.len(),
                "Loaded snapshot"
            );
        }

        let roots = config.roots.clone();
        Ok(Arc::new(Self {
            config,
            ignore_set,
            analyzer: Analyzer::new(),
            extractor: TermExtractor::new(),
            queries: QueryProcessor::new(),
            reranker: Box::new(NoopReranker),
            pool,
            state: RwLock::new(state),
            read_only: AtomicBool::new(false),
            dirty: Arc::new(AtomicBool::new(false)),
            watcher: Mutex::new(FileWatcher::new(roots)),
            saver_shutdown: Arc::new(AtomicBool::new(false)),
        }))
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Indexing
    // -----------------------------------------------------------------------

    /// Full or refresh build. `force` drops all existing state first;
    /// otherwise only files whose mtime changed (plus new and deleted paths)
    /// are re-run. Cancellation is observed between files and reported as
    /// `completed = false`, never as an error.
    pub fn index_all(&self, force: bool, cancel: &AtomicBool) -> Result<IndexReport, EngineError> {
        self.check_writable()?;
        let started = Instant::now();
        let mut report = IndexReport::default();

        let found = walk_roots(&self.config, &self.ignore_set);
        debug!(candidates = found.len(), "Walk complete");

        // Decide which files need the pipeline and which paths vanished.
        let (todo, removed): (Vec<FileInfo>, Vec<PathBuf>) = {
            let state = self.state.read().unwrap();
            if force || state.by_path.is_empty() {
                (found, Vec::new())
            } else {
                let todo: Vec<FileInfo> = found
                    .iter()
                    .filter(|info| {
                        state
                            .by_path
                            .get(&info.path)
                            .and_then(|ids| ids.first())
                            .and_then(|id| state.chunks.get(id))
                            .map(|c| c.file_mtime != info.mtime)
                            .unwrap_or(true)
                    })
                    .cloned()
                    .collect();
                let live: std::collections::HashSet<&Path> =
                    found.iter().map(|f| f.path.as_path()).collect();
                let removed = state
                    .by_path
                    .keys()
                    .filter(|p| !live.contains(p.as_path()))
                    .cloned()
                    .collect();
                (todo, removed)
            }
        };

        // Fan the file pipeline out; keep walk order so application is
        // deterministic.
        let records: Vec<(FileInfo, Result<FileRecord, String>)> = self.pool.install(|| {
            todo.par_iter()
                .map(|info| {
                    if cancel.load(Ordering::Relaxed) {
                        return (info.clone(), Err("cancelled".to_string()));
                    }
                    (info.clone(), self.process_file(info))
                })
                .collect()
        });

        // Single-threaded assembly, one write section.
        {
            let mut state = self.state.write().unwrap();
            if force {
                *state = EngineState::default();
            }
            for path in removed {
                state.remove_path(&path);
            }
            for (info, record) in records {
                if cancel.load(Ordering::Relaxed) {
                    report.elapsed_ms = started.elapsed().as_millis() as u64;
                    report.completed = false;
                    info!(files = report.files_indexed, "Indexing cancelled");
                    return Ok(report);
                }
                match record {
                    Ok(record) => {
                        state.remove_path(&info.path);
                        match state.insert_record(record) {
                            Ok(chunk_count) => {
                                report.files_indexed += 1;
                                report.chunks_indexed += chunk_count;
                            }
                            Err(e) => {
                                self.read_only.store(true, Ordering::SeqCst);
                                return Err(e);
                            }
                        }
                    }
                    Err(msg) if msg == "cancelled" => {
                        report.elapsed_ms = started.elapsed().as_millis() as u64;
                        report.completed = false;
                        return Ok(report);
                    }
                    Err(msg) => report.errors.push(msg),
                }
            }
        }

        report.completed = true;
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            files = report.files_indexed,
            chunks = report.chunks_indexed,
            errors = report.errors.len(),
            elapsed_ms = report.elapsed_ms,
            "Indexing complete"
        );

        self.save(cancel)?;
        Ok(report)
    }

    /// Run the read → chunk → analyze → tokenize pipeline for one file.
    fn process_file(&self, info: &FileInfo) -> Result<FileRecord, String> {
        let text = std::fs::read_to_string(&info.path)
            .map_err(|e| format!("{}: {e}", display_path(&info.path)))?;

        let entries = chunk_file(info, &text, self.config.chunk_lines, self.config.chunk_overlap)
            .into_iter()
            .map(|chunk| {
                let attrs = self.analyzer.analyze(&chunk);
                let terms = self.extractor.extract(&chunk.content);
                RecordEntry { chunk, attrs, terms }
            })
            .collect();

        Ok(FileRecord { path: info.path.clone(), entries })
    }

    // -----------------------------------------------------------------------
    // Incremental updates (watcher-driven)
    // -----------------------------------------------------------------------

    /// Apply a debounced event batch. Deletes drop the path's chunks;
    /// adds and changes re-run the file pipeline after dropping. Flags the
    /// index dirty so the coalescing saver schedules a snapshot.
    pub fn apply_fs_events(&self, events: Vec<FsEvent>) {
        if self.read_only.load(Ordering::SeqCst) {
            warn!("Engine is read-only after an invariant violation; ignoring events");
            return;
        }

        let mut changed = 0usize;
        let mut removed = 0usize;

        for event in events {
            if event.path.starts_with(&self.config.index_dir) {
                continue;
            }
            let fresh = match event.kind {
                FsEventKind::Delete => None,
                FsEventKind::Add | FsEventKind::Change => {
                    file_info_for(&self.config, &self.ignore_set, &event.path)
                }
            };

            match fresh {
                None => {
                    let mut state = self.state.write().unwrap();
                    if state.remove_path(&event.path) > 0 {
                        removed += 1;
                    }
                }
                Some(info) => match self.process_file(&info) {
                    Ok(record) => {
                        let mut state = self.state.write().unwrap();
                        state.remove_path(&event.path);
                        match state.insert_record(record) {
                            Ok(_) => changed += 1,
                            Err(e) => {
                                drop(state);
                                warn!(error = %e, "Invariant violation during update; going read-only");
                                self.read_only.store(true, Ordering::SeqCst);
                                return;
                            }
                        }
                    }
                    Err(msg) => warn!(error = msg.as_str(), "Skipping unreadable file"),
                },
            }
        }

        if changed > 0 || removed > 0 {
            self.dirty.store(true, Ordering::SeqCst);
            info!(changed, removed, "Incremental update applied");
        }
    }

    // -----------------------------------------------------------------------
    // Search and stats
    // -----------------------------------------------------------------------

    /// Process the query and rank against the current state. Never fails:
    /// a query that matches nothing returns the processed query and an
    /// empty list.
    pub fn search(&self, raw: &str, options: &SearchOptions) -> (ProcessedQuery, Vec<SearchResult>) {
        let cap = if options.semantic_expansion {
            MAX_VARIANTS_EXPANDED
        } else {
            MAX_VARIANTS_LEXICAL
        };
        let query = self.queries.process(raw, cap);

        let state = self.state.read().unwrap();
        let ranker = Ranker::new(&state.index, &state.chunks, &state.attrs, self.reranker.as_ref());
        let results = ranker.rank(&query, options);
        (query, results)
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read().unwrap();
        let index_stats = state.index.stats();
        IndexStats {
            total_files: state.by_path.len(),
            total_chunks: index_stats.total_chunks,
            distinct_terms: index_stats.distinct_terms,
            mean_terms_per_chunk: index_stats.mean_terms_per_chunk,
            watching: self.is_watching(),
            roots: self.config.roots.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Persistence and reset
    // -----------------------------------------------------------------------

    /// Write a snapshot of the current state.
    pub fn save(&self, cancel: &AtomicBool) -> Result<(), EngineError> {
        let state = self.state.read().unwrap();
        let mut chunks: Vec<Chunk> = state.chunks.values().cloned().collect();
        chunks.sort_by(|a, b| a.path.cmp(&b.path).then(a.chunk_index.cmp(&b.chunk_index)));
        snapshot::save(&self.config.index_dir, &chunks, &state.attrs, &state.index, cancel)
    }

    /// Drop all state, delete the snapshot, and leave the read-only safe
    /// state (the recovery path after an invariant trip).
    pub fn clear(&self) -> Result<(), EngineError> {
        {
            let mut state = self.state.write().unwrap();
            *state = EngineState::default();
        }
        snapshot::delete(&self.config.index_dir)?;
        self.read_only.store(false, Ordering::SeqCst);
        self.dirty.store(false, Ordering::SeqCst);
        info!("Index cleared");
        Ok(())
    }

    fn check_writable(&self) -> Result<(), EngineError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(EngineError::IndexInvariant(
                "engine is read-only after an invariant violation; run clear first".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Watching
    // -----------------------------------------------------------------------

    /// Start the file watcher and the coalescing snapshot saver. Idempotent.
    /// The watcher holds only a weak reference back to the engine.
    pub fn start_watching(self: &Arc<Self>) -> bool {
        let weak: Weak<Engine> = Arc::downgrade(self);
        let config = self.config.clone();
        let ignore_set = self.ignore_set.clone();

        let started = self.watcher.lock().unwrap().start(
            move |path| file_info_for(&config, &ignore_set, path).is_some(),
            move |events| {
                if let Some(engine) = weak.upgrade() {
                    engine.apply_fs_events(events);
                }
            },
        );

        if started {
            self.spawn_saver();
        }
        started
    }

    /// Stop the watcher and the saver. Idempotent. A final snapshot is
    /// written if updates are still pending.
    pub fn stop_watching(&self) {
        self.watcher.lock().unwrap().stop();
        self.saver_shutdown.store(true, Ordering::SeqCst);
        if self.dirty.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.save(&AtomicBool::new(false)) {
                warn!(error = %e, "Final snapshot write failed");
            }
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().unwrap().state() == WatchState::Ready
    }

    /// Background saver: once per coalescing window, write a snapshot if
    /// any incremental update flagged the index dirty.
    fn spawn_saver(self: &Arc<Self>) {
        self.saver_shutdown.store(false, Ordering::SeqCst);
        let weak: Weak<Engine> = Arc::downgrade(self);
        let shutdown = Arc::clone(&self.saver_shutdown);

        std::thread::spawn(move || loop {
            std::thread::sleep(Duration::from_millis(SAVE_COALESCE_MS));
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            let Some(engine) = weak.upgrade() else { break };
            if engine.dirty.swap(false, Ordering::SeqCst) {
                if let Err(e) = engine.save(&AtomicBool::new(false)) {
                    // Keep the dirty flag so the next tick retries.
                    engine.dirty.store(true, Ordering::SeqCst);
                    warn!(error = %e, "Deferred snapshot write failed");
                }
            }
        });
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.saver_shutdown.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    fn engine_for(dir: &Path) -> Arc<Engine> {
        let mut config = IndexConfig::default_for(vec![dir.to_path_buf()]);
        config.watch = false;
        Engine::new(config).unwrap()
    }

    #[test]
    fn rejects_missing_root() {
        let config = IndexConfig::default_for(vec![PathBuf::from("/nope/nothing/here")]);
        assert!(matches!(Engine::new(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn rejects_oversized_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = IndexConfig::default_for(vec![dir.path().to_path_buf()]);
        config.chunk_overlap = 101;
        config.chunk_lines = 200;
        assert!(matches!(Engine::new(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn index_then_search_single_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.ts"),
            "export async function loginWithOtp(code: string) {\n  return verify(code);\n}\n",
        )
        .unwrap();

        let engine = engine_for(dir.path());
        let report = engine.index_all(true, &no_cancel()).unwrap();
        assert!(report.completed);
        assert_eq!(report.files_indexed, 1);
        assert!(report.chunks_indexed >= 1);

        let (query, results) = engine.search("login otp", &SearchOptions::default());
        assert_eq!(query.normalized, "login otp");
        assert!(!results.is_empty());
        assert!(results[0].path.ends_with("a.ts"));
        assert!(results[0].score > 0.0);
        assert!(results[0].start_line >= 1);
    }

    #[test]
    fn refresh_reindexes_only_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const alpha = 1;\n").unwrap();
        fs::write(dir.path().join("b.ts"), "export const beta = 2;\n").unwrap();

        let engine = engine_for(dir.path());
        engine.index_all(true, &no_cancel()).unwrap();

        // No changes: nothing to do.
        let report = engine.index_all(false, &no_cancel()).unwrap();
        assert_eq!(report.files_indexed, 0);

        // Deleted file disappears from stats on refresh.
        fs::remove_file(dir.path().join("b.ts")).unwrap();
        engine.index_all(false, &no_cancel()).unwrap();
        assert_eq!(engine.stats().total_files, 1);
    }

    #[test]
    fn cancellation_reports_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const alpha = 1;\n").unwrap();

        let engine = engine_for(dir.path());
        let report = engine.index_all(true, &AtomicBool::new(true)).unwrap();
        assert!(!report.completed);
    }

    #[test]
    fn fs_events_update_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("keep.ts");
        let gone = dir.path().join("gone.ts");
        fs::write(&keep, "export const keepAlpha = 1;\n").unwrap();
        fs::write(&gone, "export const vanishingBeta = 2;\n").unwrap();

        let engine = engine_for(dir.path());
        engine.index_all(true, &no_cancel()).unwrap();
        assert_eq!(engine.stats().total_files, 2);

        fs::remove_file(&gone).unwrap();
        // The canonical root path is what the engine indexed under.
        let canonical_gone = engine.stats().roots.first().map(|r| r.join("gone.ts")).unwrap();
        engine.apply_fs_events(vec![FsEvent { kind: FsEventKind::Delete, path: canonical_gone }]);

        let (_, results) = engine.search("vanishingBeta", &SearchOptions::default());
        assert!(results.is_empty());
        assert_eq!(engine.stats().total_files, 1);

        let (_, results) = engine.search("keepAlpha", &SearchOptions::default());
        assert!(!results.is_empty());
    }

    #[test]
    fn change_event_replaces_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.ts");
        fs::write(&file, "export const staleAlpha = 1;\n").unwrap();

        let engine = engine_for(dir.path());
        engine.index_all(true, &no_cancel()).unwrap();

        fs::write(&file, "export const freshBeta = 2;\n").unwrap();
        let canonical = engine.stats().roots.first().map(|r| r.join("a.ts")).unwrap();
        engine.apply_fs_events(vec![FsEvent { kind: FsEventKind::Change, path: canonical }]);

        let (_, old) = engine.search("staleAlpha", &SearchOptions::default());
        assert!(old.is_empty());
        let (_, new) = engine.search("freshBeta", &SearchOptions::default());
        assert!(!new.is_empty());
    }

    #[test]
    fn snapshot_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export function restartProof() { return 1; }\n")
            .unwrap();

        let (before_results, before_stats) = {
            let engine = engine_for(dir.path());
            engine.index_all(true, &no_cancel()).unwrap();
            let (_, results) = engine.search("restartProof", &SearchOptions::default());
            (results, engine.stats())
        };
        assert!(!before_results.is_empty());

        let engine = engine_for(dir.path());
        let (_, after_results) = engine.search("restartProof", &SearchOptions::default());
        let after_stats = engine.stats();

        assert_eq!(before_results.len(), after_results.len());
        assert_eq!(before_results[0].chunk_id, after_results[0].chunk_id);
        assert!((before_results[0].score - after_results[0].score).abs() < 1e-9);
        assert_eq!(before_stats.total_chunks, after_stats.total_chunks);
        assert_eq!(before_stats.distinct_terms, after_stats.distinct_terms);
    }

    #[test]
    fn corrupt_snapshot_starts_empty_and_rebuilds() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const rebuildMarker = 1;\n").unwrap();

        {
            let engine = engine_for(dir.path());
            engine.index_all(true, &no_cancel()).unwrap();
        }
        let snap = dir.path().join("ultra-fast-index").join("index.json");
        let body = fs::read(&snap).unwrap();
        fs::write(&snap, &body[..body.len() / 3]).unwrap();

        let engine = engine_for(dir.path());
        assert_eq!(engine.stats().total_chunks, 0);

        let report = engine.index_all(true, &no_cancel()).unwrap();
        assert!(report.completed);
        assert_eq!(engine.stats().total_files, 1);
    }

    #[test]
    fn clear_resets_state_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const clearMarker = 1;\n").unwrap();

        let engine = engine_for(dir.path());
        engine.index_all(true, &no_cancel()).unwrap();
        engine.clear().unwrap();

        assert_eq!(engine.stats().total_chunks, 0);
        let (_, results) = engine.search("clearMarker", &SearchOptions::default());
        assert!(results.is_empty());
        assert!(!dir.path().join("ultra-fast-index").join("index.json").exists());
    }

    #[test]
    fn ignored_directories_never_index() {
        let dir = tempfile::tempdir().unwrap();
        let nm = dir.path().join("node_modules").join("dep");
        fs::create_dir_all(&nm).unwrap();
        fs::write(nm.join("x.ts"), "export const __ignored_marker__ = 1;\n").unwrap();
        fs::write(dir.path().join("a.ts"), "export const realThing = 1;\n").unwrap();

        let engine = engine_for(dir.path());
        engine.index_all(true, &no_cancel()).unwrap();

        let (_, results) = engine.search("__ignored_marker__", &SearchOptions::default());
        assert!(results.is_empty());
        assert_eq!(engine.stats().total_files, 1);
    }

    #[test]
    fn watcher_lifecycle_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const watched = 1;\n").unwrap();

        let engine = engine_for(dir.path());
        assert!(!engine.is_watching());
        assert!(engine.start_watching());
        assert!(engine.is_watching());
        assert!(engine.start_watching());

        engine.stop_watching();
        assert!(!engine.is_watching());
        engine.stop_watching();
        assert!(!engine.is_watching());
    }
}
