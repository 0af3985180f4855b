//! Black-box scenario tests for the engine facade: determinism of ingest,
//! case-shape robustness, snapshot restarts, and the live watcher path.

mod helpers;

use helpers::TestHarness;
use serde_json::json;
use std::fs;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};
use ultrafast_index::SearchOptions;

fn no_cancel() -> AtomicBool {
    AtomicBool::new(false)
}

// ---------------------------------------------------------------------------
// Determinism of ingest
// ---------------------------------------------------------------------------

#[test]
fn two_engines_over_the_same_tree_agree_exactly() {
    let files: &[(&str, &str)] = &[
        (
            "src/auth/session.ts",
            "export function refreshSession(token: string) {\n  return rotate(token);\n}\n",
        ),
        ("src/util/format.ts", "export const formatDate = (d: Date) => d.toISOString();\n"),
        ("README.md", "# demo\n\nSession handling utilities.\n"),
    ];

    let a = TestHarness::from_files(files);
    let b = TestHarness::from_files(files);

    a.engine.index_all(true, &no_cancel()).unwrap();
    b.engine.index_all(true, &no_cancel()).unwrap();

    let sa = a.engine.stats();
    let sb = b.engine.stats();
    assert_eq!(sa.total_files, sb.total_files);
    assert_eq!(sa.total_chunks, sb.total_chunks);
    assert_eq!(sa.distinct_terms, sb.distinct_terms);
    assert_eq!(sa.mean_terms_per_chunk, sb.mean_terms_per_chunk);

    // The absolute roots differ, so compare the structure of the answers,
    // not path-derived values.
    let (_, ra) = a.engine.search("refresh session", &SearchOptions::default());
    let (_, rb) = b.engine.search("refresh session", &SearchOptions::default());
    assert_eq!(ra.len(), rb.len());
    assert!(!ra.is_empty());
    assert_eq!(ra[0].start_line, rb[0].start_line);
    assert_eq!(ra[0].end_line, rb[0].end_line);
    assert!(ra[0].path.ends_with("session.ts") && rb[0].path.ends_with("session.ts"));
}

#[test]
fn reindexing_an_unchanged_tree_is_stable() {
    let h = TestHarness::from_files(&[(
        "src/a.ts",
        "export function stableTarget() { return 1; }\n",
    )]);

    h.engine.index_all(true, &no_cancel()).unwrap();
    let (_, first) = h.engine.search("stableTarget", &SearchOptions::default());

    h.engine.index_all(true, &no_cancel()).unwrap();
    let (_, second) = h.engine.search("stableTarget", &SearchOptions::default());

    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].chunk_id, second[0].chunk_id);
    assert!((first[0].score - second[0].score).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Case-shape robustness
// ---------------------------------------------------------------------------

#[test]
fn all_case_shapes_find_the_same_declaration() {
    let h = TestHarness::from_files(&[
        ("src/profile.ts", "export const userProfile = { id: 0 };\nexport function loadUserProfile() { return userProfile; }\n"),
        ("src/noise.ts", "export function unrelatedNoise() { return 9; }\n"),
    ]);
    h.engine.index_all(true, &no_cancel()).unwrap();

    let mut tops = Vec::new();
    for q in ["user profile", "UserProfile", "user_profile", "user-profile"] {
        let (_, results) = h.engine.search(q, &SearchOptions::default());
        assert!(!results.is_empty(), "{q:?} found nothing");
        tops.push(results[0].path.clone());
    }
    assert!(tops.iter().all(|p| p == &tops[0]), "tops diverged: {tops:?}");
    assert!(tops[0].ends_with("profile.ts"));
}

// ---------------------------------------------------------------------------
// Snapshot restart through the tool surface
// ---------------------------------------------------------------------------

#[test]
fn restart_preserves_search_results_and_stats() {
    let mut h = TestHarness::from_files(&[
        ("src/a.ts", "export function firstThing() { return 1; }\n"),
        ("src/b.ts", "export function secondThing() { return 2; }\n"),
        ("src/c.ts", "export function thirdThing() { return 3; }\n"),
    ]);
    h.call_tool("index_codebase", json!({ "no_watch": true }));
    let (before_search, _) = h.call_tool("search_code", json!({ "query": "secondThing" }));
    let (before_stats, _) = h.call_tool("get_index_stats", json!({}));

    let mut restarted = h.restart();
    let (after_search, _) = restarted.call_tool("search_code", json!({ "query": "secondThing" }));
    let (after_stats, _) = restarted.call_tool("get_index_stats", json!({}));

    assert_eq!(before_search, after_search);
    assert_eq!(before_stats, after_stats);
}

// ---------------------------------------------------------------------------
// Live watcher: debounced delete reaches the index
// ---------------------------------------------------------------------------

/// Poll until `pred` holds or the deadline passes.
fn wait_for(mut pred: impl FnMut() -> bool, deadline: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    pred()
}

#[test]
fn deleting_a_file_drops_its_terms_after_the_debounce_window() {
    let h = TestHarness::from_files(&[
        ("src/keep.ts", "export const keepAlpha = 1;\n"),
        ("src/gone.ts", "export const doomedGamma = 2;\n"),
    ]);
    h.engine.index_all(true, &no_cancel()).unwrap();
    assert!(h.engine.start_watching());

    let victim = h.root().join("src/gone.ts");
    fs::remove_file(&victim).unwrap();

    let engine = h.engine.clone();
    let dropped = wait_for(
        || {
            let (_, results) = engine.search("doomedGamma", &SearchOptions::default());
            results.is_empty()
        },
        Duration::from_secs(10),
    );
    assert!(dropped, "deleted file still searchable after the debounce window");
    assert_eq!(h.engine.stats().total_files, 1);

    let (_, kept) = h.engine.search("keepAlpha", &SearchOptions::default());
    assert!(!kept.is_empty(), "surviving file must stay searchable");

    h.engine.stop_watching();
}

#[test]
fn creating_a_file_becomes_searchable_after_the_debounce_window() {
    let h = TestHarness::from_files(&[("src/seed.ts", "export const seedValue = 1;\n")]);
    h.engine.index_all(true, &no_cancel()).unwrap();
    assert!(h.engine.start_watching());

    fs::write(
        h.root().join("src/arrival.ts"),
        "export function lateArrival() { return 42; }\n",
    )
    .unwrap();

    let engine = h.engine.clone();
    let indexed = wait_for(
        || {
            let (_, results) = engine.search("lateArrival", &SearchOptions::default());
            !results.is_empty()
        },
        Duration::from_secs(10),
    );
    assert!(indexed, "new file never became searchable");

    h.engine.stop_watching();
}
