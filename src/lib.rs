//! Ultra-fast local code search: a persistent inverted index over code
//! chunks with a multi-signal ranker, incremental file watching, and an MCP
//! stdio server so AI coding assistants can drive it.
//!
//! The [`engine::Engine`] facade is the single entry point; everything else
//! is a stage of its pipeline: [`walk`] enumerates files, [`chunk`] windows
//! them, [`analyze`] derives structural attributes, [`tokenize`] produces
//! terms, [`index`] maintains the inverted tables, [`query`] and [`rank`]
//! answer searches, [`snapshot`] persists, [`watch`] feeds incremental
//! updates.

pub mod analyze;
pub mod chunk;
pub mod engine;
pub mod error;
pub mod index;
pub mod mcp;
pub mod query;
pub mod rank;
pub mod snapshot;
pub mod tokenize;
pub mod types;
pub mod walk;
pub mod watch;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use types::{IndexConfig, IndexReport, IndexStats, SearchOptions, SearchResult};
