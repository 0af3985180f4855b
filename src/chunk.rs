//! Line-window chunker.
//!
//! Splits file text into contiguous (optionally overlapping) line windows.
//! Chunk ids are content-derived and byte-identical across runs over
//! unchanged input.

use crate::types::{Chunk, FileInfo};
use sha2::{Digest, Sha256};

/// Minimum non-whitespace characters a chunk body must contain.
const MIN_CHUNK_BODY: usize = 3;

/// Hex SHA-256 of a chunk body.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable chunk id: first 16 bytes of `SHA-256(path ∥ ":" ∥ index ∥ ":" ∥
/// content_hash)`, lowercase hex.
pub fn chunk_id(path: &str, chunk_index: usize, content_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(b":");
    hasher.update(chunk_index.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(content_hash.as_bytes());
    let digest = hasher.finalize();
    let mut id = String::with_capacity(32);
    for byte in &digest[..16] {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}

/// Split file text into chunks of `window` lines advancing by
/// `window - overlap` lines. The first chunk starts at line 1; the last
/// chunk ends at the file's last line; chunk indexes are 0-based and
/// contiguous. Bodies with fewer than three non-whitespace characters are
/// dropped (their index is not consumed).
pub fn chunk_file(file: &FileInfo, text: &str, window: usize, overlap: usize) -> Vec<Chunk> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let window = window.max(1);
    let step = window.saturating_sub(overlap).max(1);
    let path_str = crate::types::display_path(&file.path);

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut chunk_index = 0usize;

    while start < lines.len() {
        let end = (start + window).min(lines.len());
        let body = lines[start..end].join("\n");

        let significant = body.chars().filter(|c| !c.is_whitespace()).count();
        if significant >= MIN_CHUNK_BODY {
            let hash = content_hash(&body);
            let id = chunk_id(&path_str, chunk_index, &hash);
            chunks.push(Chunk {
                id,
                path: file.path.clone(),
                language: file.language.to_string(),
                chunk_index,
                start_line: start + 1,
                end_line: end,
                content: body,
                content_hash: hash,
                file_mtime: file.mtime,
            });
            chunk_index += 1;
        }

        if end == lines.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file() -> FileInfo {
        FileInfo { path: PathBuf::from("/p/a.ts"), size: 0, mtime: 7, language: "typescript" }
    }

    fn numbered_lines(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn covers_whole_file() {
        let text = numbered_lines(75);
        let chunks = chunk_file(&file(), &text, 30, 0);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 30);
        assert_eq!(chunks[1].start_line, 31);
        assert_eq!(chunks[2].end_line, 75);
        assert_eq!(chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn overlap_shifts_window_start() {
        let text = numbered_lines(60);
        let chunks = chunk_file(&file(), &text, 30, 10);

        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[1].start_line, 21);
        assert_eq!(chunks.last().unwrap().end_line, 60);
    }

    #[test]
    fn drops_near_empty_bodies() {
        let chunks = chunk_file(&file(), "  \n\n \n", 30, 0);
        assert!(chunks.is_empty());
    }

    #[test]
    fn ids_are_deterministic() {
        let text = numbered_lines(40);
        let a = chunk_file(&file(), &text, 30, 0);
        let b = chunk_file(&file(), &text, 30, 0);
        assert_eq!(a, b);
        assert_eq!(a[0].id.len(), 32);
        assert_ne!(a[0].id, a[1].id);
    }

    #[test]
    fn id_depends_on_path_and_content() {
        let text = numbered_lines(10);
        let a = chunk_file(&file(), &text, 30, 0);
        let other = FileInfo { path: PathBuf::from("/p/b.ts"), ..file() };
        let b = chunk_file(&other, &text, 30, 0);
        assert_ne!(a[0].id, b[0].id);

        let c = chunk_file(&file(), &numbered_lines(11), 30, 0);
        assert_ne!(a[0].id, c[0].id);
    }
}
