//! Snapshot persistence.
//!
//! One self-contained `index.json` under the index directory holds the chunk
//! list, the structural-attributes map, and the three inverted tables.
//! Writes go to a temp file and rename into place, so the prior snapshot is
//! either fully replaced or untouched. Loads validate the format version and
//! cross-table consistency; anything off is `CorruptSnapshot` and the caller
//! falls back to an empty state.

use crate::error::EngineError;
use crate::index::InvertedIndex;
use crate::types::{Chunk, ChunkId, StructuralAttributes, SNAPSHOT_FILE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Bumped whenever the on-disk layout changes; mismatches force a rebuild.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub format_version: u32,
    /// Seconds since the Unix epoch at write time.
    pub created_at: u64,
    pub path_count: usize,
    pub chunk_count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub header: SnapshotHeader,
    pub chunks: Vec<Chunk>,
    pub attributes: HashMap<ChunkId, StructuralAttributes>,
    pub index: InvertedIndex,
}

/// Path of the snapshot file inside an index directory.
pub fn snapshot_path(index_dir: &Path) -> PathBuf {
    index_dir.join(SNAPSHOT_FILE)
}

/// Write a snapshot atomically. The cancellation flag is observed between
/// the serialization and the rename; a cancelled save leaves the previous
/// snapshot in place.
pub fn save(
    index_dir: &Path,
    chunks: &[Chunk],
    attributes: &HashMap<ChunkId, StructuralAttributes>,
    index: &InvertedIndex,
    cancel: &AtomicBool,
) -> Result<(), EngineError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(EngineError::Cancelled);
    }
    std::fs::create_dir_all(index_dir).map_err(|e| EngineError::io(index_dir, e))?;

    let path_count = {
        let mut paths: Vec<&Path> = chunks.iter().map(|c| c.path.as_path()).collect();
        paths.sort();
        paths.dedup();
        paths.len()
    };

    let snapshot = IndexSnapshot {
        header: SnapshotHeader {
            format_version: FORMAT_VERSION,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            path_count,
            chunk_count: chunks.len(),
        },
        chunks: chunks.to_vec(),
        attributes: attributes.clone(),
        index: index.clone(),
    };

    let body = serde_json::to_vec(&snapshot)
        .map_err(|e| EngineError::CorruptSnapshot(format!("serialize failed: {e}")))?;

    if cancel.load(Ordering::Relaxed) {
        return Err(EngineError::Cancelled);
    }

    let final_path = snapshot_path(index_dir);
    let tmp_path = index_dir.join(format!("{SNAPSHOT_FILE}.tmp"));
    std::fs::write(&tmp_path, &body).map_err(|e| EngineError::io(&tmp_path, e))?;
    if let Err(e) = std::fs::rename(&tmp_path, &final_path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(EngineError::io(&final_path, e));
    }

    info!(
        path = %final_path.display(),
        chunks = snapshot.header.chunk_count,
        files = snapshot.header.path_count,
        "Snapshot written"
    );
    Ok(())
}

/// Load and validate a snapshot. `Ok(None)` means no snapshot exists;
/// `Err(CorruptSnapshot)` means one exists but is unusable.
pub fn load(index_dir: &Path) -> Result<Option<IndexSnapshot>, EngineError> {
    let path = snapshot_path(index_dir);
    let body = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(EngineError::io(&path, e)),
    };

    let snapshot: IndexSnapshot = serde_json::from_slice(&body)
        .map_err(|e| EngineError::CorruptSnapshot(format!("unreadable snapshot: {e}")))?;

    if snapshot.header.format_version != FORMAT_VERSION {
        return Err(EngineError::CorruptSnapshot(format!(
            "format version {} (current {FORMAT_VERSION})",
            snapshot.header.format_version
        )));
    }
    if snapshot.header.chunk_count != snapshot.chunks.len() {
        return Err(EngineError::CorruptSnapshot(format!(
            "header claims {} chunks, file holds {}",
            snapshot.header.chunk_count,
            snapshot.chunks.len()
        )));
    }
    for chunk in &snapshot.chunks {
        if chunk.start_line > chunk.end_line {
            return Err(EngineError::CorruptSnapshot(format!(
                "chunk {} has inverted line span",
                chunk.id
            )));
        }
        if !snapshot.index.contains_chunk(&chunk.id) {
            return Err(EngineError::CorruptSnapshot(format!(
                "chunk {} missing from inverted index",
                chunk.id
            )));
        }
    }
    // Cross-table invariants of the inverted index itself.
    snapshot.index.verify().map_err(|e| match e {
        EngineError::IndexInvariant(msg) => EngineError::CorruptSnapshot(msg),
        other => other,
    })?;

    Ok(Some(snapshot))
}

/// Load, demoting corruption to a loud log line and `None` so the engine
/// rebuilds from scratch.
pub fn load_or_empty(index_dir: &Path) -> Option<IndexSnapshot> {
    match load(index_dir) {
        Ok(found) => found,
        Err(e) => {
            warn!(index_dir = %index_dir.display(), error = %e, "Discarding unusable snapshot");
            None
        }
    }
}

/// Delete the snapshot file. Missing files are fine.
pub fn delete(index_dir: &Path) -> Result<(), EngineError> {
    let path = snapshot_path(index_dir);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::io(&path, e)),
    }
}
