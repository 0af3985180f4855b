//! Error taxonomy for the engine.
//!
//! Per-file IO failures and regex extraction failures never surface here —
//! they are recovered locally and counted in [`crate::types::IndexReport`]
//! `errors`. Everything below crosses a public API boundary.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid root path or option. Reported before any work begins.
    #[error("config error: {0}")]
    Config(String),

    /// A snapshot read or write failed. The prior snapshot is left intact.
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot on disk is unusable: wrong version, missing tables, or
    /// cross-table inconsistency. The engine continues with empty state.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// An inverted-index invariant would be violated. Programmer bug; the
    /// engine goes read-only until `clear()`.
    #[error("index invariant violated: {0}")]
    IndexInvariant(String),

    /// The caller's cancellation signal fired. Work was rolled back to the
    /// last stable boundary.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io { path: path.into(), source }
    }
}
