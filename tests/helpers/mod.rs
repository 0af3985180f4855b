//! Test harness: a temp project tree plus an engine, driven through the
//! JSON-RPC dispatch exactly as an MCP client would.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use ultrafast_index::mcp::dispatch_jsonrpc;
use ultrafast_index::{Engine, IndexConfig};

pub struct TestHarness {
    // Held for its Drop; the project tree lives here.
    _dir: TempDir,
    pub engine: Arc<Engine>,
    next_id: u64,
}

impl TestHarness {
    /// Build a project from `(relative_path, content)` pairs and open an
    /// engine over it. Watching stays off unless a test starts it.
    pub fn from_files(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        for (rel, content) in files {
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("mkdir");
            }
            fs::write(&path, content).expect("write fixture");
        }

        let mut config = IndexConfig::default_for(vec![dir.path().to_path_buf()]);
        config.watch = false;
        let engine = Engine::new(config).expect("engine");
        Self { _dir: dir, engine, next_id: 0 }
    }

    pub fn root(&self) -> &Path {
        self.engine.config().roots.first().expect("root").as_path()
    }

    /// Drop the engine and open a fresh one over the same project tree and
    /// index directory, as a process restart would.
    pub fn restart(self) -> Self {
        let TestHarness { _dir, engine, .. } = self;
        drop(engine);

        let mut config = IndexConfig::default_for(vec![_dir.path().to_path_buf()]);
        config.watch = false;
        let engine = Engine::new(config).expect("engine restart");
        Self { _dir, engine, next_id: 0 }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Send a raw JSON-RPC request and return the response.
    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let msg = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id(),
            "method": method,
            "params": params,
        });
        dispatch_jsonrpc(&self.engine, &msg).expect("request should produce a response")
    }

    pub fn initialize(&mut self) -> serde_json::Value {
        self.request(
            "initialize",
            serde_json::json!({
                "protocolVersion": "2025-06-18",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "0" }
            }),
        )
    }

    /// Call a tool; returns `(text, is_error)` where errors are the in-band
    /// warning-prefixed messages.
    pub fn call_tool(&mut self, name: &str, args: serde_json::Value) -> (String, bool) {
        let resp = self.request(
            "tools/call",
            serde_json::json!({ "name": name, "arguments": args }),
        );
        let text = resp["result"]["content"][0]["text"].as_str().unwrap_or_default().to_string();
        let is_error = text.starts_with('\u{26a0}');
        (text, is_error)
    }
}
