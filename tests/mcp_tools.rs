//! Integration tests for the MCP tool surface via `dispatch_jsonrpc`.
//!
//! Each test builds an engine over a generated fixture project, then sends
//! JSON-RPC requests and validates the textual reports.

mod helpers;

use helpers::TestHarness;
use serde_json::json;

const AUTH_TS: &str = "// one-time password login\nexport async function loginWithOtp(code: string) {\n  return verify(code);\n}\n";
const DB_TS: &str = "export function runMigration(db: Pool) {\n  return db.exec('create table users');\n}\n";

fn fixture() -> TestHarness {
    TestHarness::from_files(&[("src/auth.ts", AUTH_TS), ("src/db.ts", DB_TS)])
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

#[test]
fn initialize_negotiates_version_and_reports_server() {
    let mut h = fixture();
    let resp = h.initialize();

    assert_eq!(resp["result"]["protocolVersion"].as_str().unwrap(), "2025-06-18");
    assert_eq!(resp["result"]["serverInfo"]["name"].as_str().unwrap(), "ultrafast-index");
    assert!(resp["result"]["capabilities"]["tools"].is_object());
}

#[test]
fn tools_list_contains_the_six_tools() {
    let mut h = fixture();
    h.initialize();
    let resp = h.request("tools/list", json!({}));
    let tools = resp["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();

    for expected in [
        "index_codebase",
        "search_code",
        "get_index_stats",
        "clear_index",
        "start_watching",
        "stop_watching",
    ] {
        assert!(names.contains(&expected), "missing tool {expected}");
    }
}

#[test]
fn unknown_method_errors() {
    let mut h = fixture();
    let resp = h.request("bogus/method", json!({}));
    assert_eq!(resp["error"]["code"].as_i64().unwrap(), -32601);
}

#[test]
fn unknown_tool_reports_in_band() {
    let mut h = fixture();
    let (text, is_err) = h.call_tool("nonexistent_tool", json!({}));
    assert!(is_err, "expected error, got: {text}");
}

// ---------------------------------------------------------------------------
// index_codebase + search_code
// ---------------------------------------------------------------------------

#[test]
fn index_then_search_finds_the_function() {
    let mut h = fixture();
    let (text, is_err) = h.call_tool("index_codebase", json!({ "no_watch": true }));
    assert!(!is_err, "index failed: {text}");
    assert!(text.contains("2 file(s)"), "unexpected report: {text}");

    let (text, is_err) = h.call_tool("search_code", json!({ "query": "login otp" }));
    assert!(!is_err, "search failed: {text}");
    assert!(text.contains("auth.ts"), "expected auth.ts in: {text}");
    assert!(text.contains("score="), "expected scores in: {text}");
    assert!(text.contains("lines 1-"), "expected a line span in: {text}");
}

#[test]
fn search_without_query_is_an_error() {
    let mut h = fixture();
    h.call_tool("index_codebase", json!({ "no_watch": true }));
    let (_, is_err) = h.call_tool("search_code", json!({}));
    assert!(is_err);
}

#[test]
fn search_respects_file_path_filter() {
    let mut h = fixture();
    h.call_tool("index_codebase", json!({ "no_watch": true }));

    let (text, _) = h.call_tool(
        "search_code",
        json!({ "query": "users migration", "file_path": "db.ts" }),
    );
    assert!(!text.contains("auth.ts"), "filter leaked: {text}");
}

#[test]
fn search_can_suppress_content() {
    let mut h = fixture();
    h.call_tool("index_codebase", json!({ "no_watch": true }));

    let (text, _) = h.call_tool(
        "search_code",
        json!({ "query": "loginWithOtp", "include_content": false }),
    );
    assert!(!text.contains("| export"), "content should be suppressed: {text}");
}

#[test]
fn empty_result_reports_the_processed_query() {
    let mut h = fixture();
    h.call_tool("index_codebase", json!({ "no_watch": true }));

    let (text, is_err) = h.call_tool("search_code", json!({ "query": "zebra quokka" }));
    assert!(!is_err);
    assert!(text.contains("No results"), "expected empty report: {text}");
    assert!(text.contains("variant"), "expected variant count: {text}");
}

// ---------------------------------------------------------------------------
// get_index_stats
// ---------------------------------------------------------------------------

#[test]
fn stats_report_counts_and_roots() {
    let mut h = fixture();
    h.call_tool("index_codebase", json!({ "no_watch": true }));

    let (text, is_err) = h.call_tool("get_index_stats", json!({}));
    assert!(!is_err);
    assert!(text.contains("Files: 2"), "unexpected stats: {text}");
    assert!(text.contains("Distinct terms:"), "unexpected stats: {text}");
    assert!(text.contains("Watching: false"), "unexpected stats: {text}");
}

// ---------------------------------------------------------------------------
// clear_index
// ---------------------------------------------------------------------------

#[test]
fn clear_requires_confirmation() {
    let mut h = fixture();
    h.call_tool("index_codebase", json!({ "no_watch": true }));

    let (_, is_err) = h.call_tool("clear_index", json!({}));
    assert!(is_err, "clear without confirm must fail");

    let (text, is_err) = h.call_tool("clear_index", json!({ "confirm": true }));
    assert!(!is_err, "confirmed clear failed: {text}");

    let (text, _) = h.call_tool("get_index_stats", json!({}));
    assert!(text.contains("Files: 0"), "index should be empty: {text}");
}

// ---------------------------------------------------------------------------
// start_watching / stop_watching
// ---------------------------------------------------------------------------

#[test]
fn watch_tools_toggle_the_watcher() {
    let mut h = fixture();
    h.call_tool("index_codebase", json!({ "no_watch": true }));

    let (text, is_err) = h.call_tool("start_watching", json!({}));
    assert!(!is_err, "start_watching failed: {text}");

    let (text, _) = h.call_tool("get_index_stats", json!({}));
    assert!(text.contains("Watching: true"), "watcher should be on: {text}");

    // Idempotent.
    let (_, is_err) = h.call_tool("start_watching", json!({}));
    assert!(!is_err);

    let (_, is_err) = h.call_tool("stop_watching", json!({}));
    assert!(!is_err);
    let (text, _) = h.call_tool("get_index_stats", json!({}));
    assert!(text.contains("Watching: false"), "watcher should be off: {text}");
}
