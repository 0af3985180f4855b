//! MCP JSON-RPC stdio server.
//!
//! Thin request/response layer over the engine facade: six tools
//! (`index_codebase`, `search_code`, `get_index_stats`, `clear_index`,
//! `start_watching`, `stop_watching`), protocol version negotiation, and
//! newline-delimited JSON-RPC 2.0 framing on stdin/stdout. Every handler is
//! argument plumbing around one engine call plus a textual report.

use crate::engine::Engine;
use crate::types::{display_path, SearchOptions};
use std::io::{self, BufRead, Write as IoWrite};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Protocol revisions this server understands, newest first.
const SUPPORTED_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// Longest chunk preview included in a search report.
const PREVIEW_CHARS: usize = 400;

fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_VERSIONS
        .iter()
        .find(|v| **v == requested)
        .copied()
        .unwrap_or(SUPPORTED_VERSIONS[0])
}

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

fn tool_definitions() -> serde_json::Value {
    serde_json::json!([
        {
            "name": "index_codebase",
            "description": "Build or refresh the persistent code index for the configured project roots. Run this once before searching; afterwards the watcher keeps the index fresh.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "force": { "type": "boolean", "description": "Rebuild from scratch instead of refreshing changed files (default: false)" },
                    "no_watch": { "type": "boolean", "description": "Skip starting the file watcher after indexing (default: false)" }
                }
            }
        },
        {
            "name": "search_code",
            "description": "Search the indexed code. Natural-language or identifier queries both work ('login otp', 'UserProfile', 'fix token refresh error'). Returns ranked chunks with path, score, and line span.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search terms" },
                    "top_k": { "type": "integer", "description": "Max results (default: 10)" },
                    "min_score": { "type": "number", "description": "Drop results scoring below this (default: 0)" },
                    "language": { "type": "string", "description": "Restrict to one language tag (e.g. 'typescript')" },
                    "file_path": { "type": "string", "description": "Restrict to paths containing this substring" },
                    "include_content": { "type": "boolean", "description": "Include a content preview per result (default: true)" },
                    "fuzzy": { "type": "boolean", "description": "Allow small-edit-distance symbol matches (default: true)" }
                },
                "required": ["query"]
            }
        },
        {
            "name": "get_index_stats",
            "description": "Report index health: file and chunk counts, distinct terms, watcher state, and the configured roots.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "clear_index",
            "description": "Delete the snapshot and reset the in-memory index. Destructive; requires confirm=true.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "confirm": { "type": "boolean", "description": "Must be true" }
                },
                "required": ["confirm"]
            }
        },
        {
            "name": "start_watching",
            "description": "Start the file watcher for incremental live re-indexing of the project roots.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "stop_watching",
            "description": "Stop the file watcher. A final snapshot is written if updates are pending.",
            "inputSchema": { "type": "object", "properties": {} }
        }
    ])
}

// ---------------------------------------------------------------------------
// Tool handlers
// ---------------------------------------------------------------------------

fn handle_tool_call(
    engine: &Arc<Engine>,
    name: &str,
    args: &serde_json::Value,
) -> (String, bool) {
    match name {
        "index_codebase" => {
            let force = args["force"].as_bool().unwrap_or(false);
            let no_watch = args["no_watch"].as_bool().unwrap_or(false);

            match engine.index_all(force, &AtomicBool::new(false)) {
                Err(e) => (format!("Error: {e}"), true),
                Ok(report) => {
                    let mut out = format!(
                        "Indexed {} file(s), {} chunk(s) in {} ms ({}).\n",
                        report.files_indexed,
                        report.chunks_indexed,
                        report.elapsed_ms,
                        if report.completed { "complete" } else { "cancelled" },
                    );
                    if !report.errors.is_empty() {
                        out.push_str(&format!("{} file(s) skipped:\n", report.errors.len()));
                        for err in report.errors.iter().take(10) {
                            out.push_str(&format!("  {err}\n"));
                        }
                    }
                    if !no_watch && engine.config().watch && report.completed {
                        let watching = engine.start_watching();
                        out.push_str(if watching {
                            "Watching for changes.\n"
                        } else {
                            "Watcher failed to start.\n"
                        });
                    }
                    (out, false)
                }
            }
        }
        "search_code" => {
            let Some(query) = args["query"].as_str().filter(|q| !q.trim().is_empty()) else {
                return ("Error: 'query' is required".to_string(), true);
            };
            let include_content = args["include_content"].as_bool().unwrap_or(true);
            let options = SearchOptions {
                max_results: args["top_k"].as_u64().unwrap_or(10).clamp(1, 100) as usize,
                min_score: args["min_score"].as_f64().unwrap_or(0.0),
                fuzzy: args["fuzzy"].as_bool().unwrap_or(true),
                language: args["language"].as_str().map(str::to_string),
                file_path: args["file_path"].as_str().map(str::to_string),
                ..Default::default()
            };

            let (processed, results) = engine.search(query, &options);
            if results.is_empty() {
                return (
                    format!(
                        "No results for \"{}\" (intent: {:?}, {} variant(s) tried).",
                        processed.normalized,
                        processed.intent.kind,
                        processed.variants.len()
                    ),
                    false,
                );
            }

            let mut out = format!("Found {} result(s) for \"{}\":\n\n", results.len(), processed.normalized);
            for (i, r) in results.iter().enumerate() {
                out.push_str(&format!(
                    "{}. {} [{}] lines {}-{}  score={:.2} relevance={:.2} ({})\n",
                    i + 1,
                    display_path(&r.path),
                    r.language,
                    r.start_line,
                    r.end_line,
                    r.score,
                    r.relevance,
                    r.explanation,
                ));
                if include_content {
                    if let Some(content) = &r.content {
                        let preview: String = content.chars().take(PREVIEW_CHARS).collect();
                        for line in preview.lines() {
                            out.push_str(&format!("   | {line}\n"));
                        }
                        if content.len() > PREVIEW_CHARS {
                            out.push_str("   | …\n");
                        }
                    }
                }
                out.push('\n');
            }
            (out, false)
        }
        "get_index_stats" => {
            let stats = engine.stats();
            let roots: Vec<String> = stats.roots.iter().map(|r| display_path(r)).collect();
            (
                format!(
                    "Files: {}\nChunks: {}\nDistinct terms: {}\nMean terms/chunk: {:.1}\nWatching: {}\nRoots:\n{}\n",
                    stats.total_files,
                    stats.total_chunks,
                    stats.distinct_terms,
                    stats.mean_terms_per_chunk,
                    stats.watching,
                    roots.iter().map(|r| format!("  {r}")).collect::<Vec<_>>().join("\n"),
                ),
                false,
            )
        }
        "clear_index" => {
            if !args["confirm"].as_bool().unwrap_or(false) {
                return ("Error: pass confirm=true to clear the index".to_string(), true);
            }
            match engine.clear() {
                Ok(()) => ("Index cleared.".to_string(), false),
                Err(e) => (format!("Error: {e}"), true),
            }
        }
        "start_watching" => {
            if engine.start_watching() {
                ("Watching for changes.".to_string(), false)
            } else {
                ("Error: watcher failed to start".to_string(), true)
            }
        }
        "stop_watching" => {
            engine.stop_watching();
            ("Watcher stopped.".to_string(), false)
        }
        _ => (format!("Error: unknown tool '{name}'"), true),
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC dispatch
// ---------------------------------------------------------------------------

pub fn dispatch_jsonrpc(
    engine: &Arc<Engine>,
    msg: &serde_json::Value,
) -> Option<serde_json::Value> {
    let method = msg["method"].as_str().unwrap_or("");
    let id = msg.get("id").cloned();

    // Notifications have no id and produce no response.
    if id.is_none() || method.starts_with("notifications/") {
        return None;
    }

    let response = match method {
        "initialize" => {
            let requested = msg["params"]["protocolVersion"].as_str().unwrap_or("");
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": negotiate_version(requested),
                    "capabilities": { "tools": { "listChanged": false } },
                    "serverInfo": {
                        "name": "ultrafast-index",
                        "version": env!("CARGO_PKG_VERSION")
                    },
                    "instructions": "Local code search. Run index_codebase once, then search_code with natural-language or identifier queries. get_index_stats reports index health."
                }
            })
        }
        "tools/list" => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "tools": tool_definitions() }
        }),
        "tools/call" => {
            let tool_name = msg["params"]["name"].as_str().unwrap_or("");
            let arguments = msg["params"].get("arguments").cloned().unwrap_or(serde_json::json!({}));
            let (text, is_error) = handle_tool_call(engine, tool_name, &arguments);

            // Errors stay in-band: a prefixed message instead of isError,
            // so one failing call does not cascade into parallel siblings.
            let content_text = if is_error { format!("\u{26a0} {text}") } else { text };
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{ "type": "text", "text": content_text }],
                    "isError": false
                }
            })
        }
        "ping" => serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
        _ => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": "Method not found" }
        }),
    };

    Some(response)
}

// ---------------------------------------------------------------------------
// Stdio loop
// ---------------------------------------------------------------------------

/// Run the MCP stdio loop until stdin closes. Requests before `initialize`
/// are rejected per the protocol.
pub fn run_mcp(engine: Arc<Engine>) {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let reader = stdin.lock();
    let mut initialized = false;

    {
        let stats = engine.stats();
        tracing::info!(
            files = stats.total_files,
            chunks = stats.total_chunks,
            "MCP server ready"
        );
    }

    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let msg: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => {
                let err = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": null,
                    "error": { "code": -32700, "message": "Parse error" }
                });
                let mut out = stdout.lock();
                let _ = writeln!(out, "{err}");
                let _ = out.flush();
                continue;
            }
        };

        let method = msg["method"].as_str().unwrap_or("");
        if method.starts_with("notifications/") {
            continue;
        }

        if !initialized && method != "initialize" && method != "ping" {
            if let Some(id) = msg.get("id").cloned() {
                let err = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32002, "message": "Server not initialized. Send 'initialize' first." }
                });
                let mut out = stdout.lock();
                let _ = writeln!(out, "{err}");
                let _ = out.flush();
            }
            continue;
        }

        if let Some(response) = dispatch_jsonrpc(&engine, &msg) {
            if method == "initialize" {
                initialized = true;
            }
            let mut out = stdout.lock();
            let _ = writeln!(out, "{}", serde_json::to_string(&response).unwrap_or_default());
            let _ = out.flush();
        }
    }
}
