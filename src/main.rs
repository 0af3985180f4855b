//! ultrafast-index binary — CLI shell and MCP stdio entry point over the
//! library crate.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tracing::{error, info};

use ultrafast_index::mcp::run_mcp;
use ultrafast_index::types::display_path;
use ultrafast_index::{Engine, IndexConfig, SearchOptions};

// ---------------------------------------------------------------------------
// CLI definition (clap derive)
// ---------------------------------------------------------------------------

/// Ultra-fast local code search — persistent inverted index with an MCP
/// stdio server for AI coding assistants.
#[derive(Parser)]
#[command(name = "ultrafast-index", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run as MCP stdio server (roots from PROJECT_PATH / PROJECT_PATHS)
    #[arg(long)]
    mcp: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index for one or more project paths
    Index {
        /// Project paths (default: current directory)
        paths: Vec<PathBuf>,

        /// Index directory (default: ./ultra-fast-index under the first path)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Stay running and watch for changes after indexing (default)
        #[arg(long, conflicts_with = "no_watch")]
        watch: bool,

        /// Exit after indexing instead of watching
        #[arg(long)]
        no_watch: bool,

        /// Rebuild from scratch even if a snapshot exists
        #[arg(long)]
        force: bool,
    },
    /// Run a single query against an existing index
    Search {
        /// The query string
        query: String,

        /// Project paths the index was built for (default: current directory)
        #[arg(long, value_name = "DIR", num_args = 1..)]
        paths: Vec<PathBuf>,

        /// Index directory
        #[arg(long)]
        index: Option<PathBuf>,

        /// Max results
        #[arg(long, default_value_t = 10)]
        top_k: usize,

        /// Drop results scoring below this
        #[arg(long, default_value_t = 0.0)]
        min_score: f64,

        /// Restrict to one language tag
        #[arg(long)]
        language: Option<String>,

        /// Restrict to paths containing this substring
        #[arg(long)]
        file_path: Option<String>,

        /// Print match locations only, no chunk content
        #[arg(long)]
        no_content: bool,
    },
    /// Print index statistics
    Stats {
        #[arg(long, value_name = "DIR", num_args = 1..)]
        paths: Vec<PathBuf>,

        #[arg(long)]
        index: Option<PathBuf>,
    },
    /// Delete the snapshot and reset the index
    Clear {
        #[arg(long, value_name = "DIR", num_args = 1..)]
        paths: Vec<PathBuf>,

        #[arg(long)]
        index: Option<PathBuf>,

        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Config resolution
// ---------------------------------------------------------------------------

/// Roots from CLI args, falling back to PROJECT_PATH / PROJECT_PATHS, then
/// the current directory.
fn resolve_roots(cli_paths: &[PathBuf]) -> Vec<PathBuf> {
    if !cli_paths.is_empty() {
        return cli_paths.to_vec();
    }
    if let Ok(joined) = std::env::var("PROJECT_PATHS") {
        let roots: Vec<PathBuf> =
            joined.split(',').map(str::trim).filter(|s| !s.is_empty()).map(PathBuf::from).collect();
        if !roots.is_empty() {
            return roots;
        }
    }
    if let Ok(single) = std::env::var("PROJECT_PATH") {
        if !single.trim().is_empty() {
            return vec![PathBuf::from(single.trim())];
        }
    }
    vec![std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))]
}

fn resolve_config(cli_paths: &[PathBuf], index_dir: Option<PathBuf>, watch: bool) -> IndexConfig {
    let mut config = IndexConfig::default_for(resolve_roots(cli_paths));
    if let Some(dir) = index_dir
        .or_else(|| std::env::var("ULTRAFAST_INDEX_DIR").ok().map(PathBuf::from))
    {
        config.index_dir = dir;
    }
    config.watch = watch;
    config
}

fn open_engine(config: IndexConfig) -> std::sync::Arc<Engine> {
    match Engine::new(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Failed to open engine");
            std::process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ultrafast_index=info".parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.mcp {
        let engine = open_engine(resolve_config(&[], None, true));
        run_mcp(engine);
        return;
    }

    match cli.command {
        None => {
            // No subcommand, no --mcp: show help and fail.
            let _ = Cli::command().print_help();
            std::process::exit(1);
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "ultrafast-index", &mut std::io::stdout());
        }
        Some(Commands::Index { paths, output, watch, no_watch, force }) => {
            // --watch is the default; --no-watch wins when given.
            let watch_mode = watch || !no_watch;
            let engine = open_engine(resolve_config(&paths, output, watch_mode));
            let report = match engine.index_all(force, &AtomicBool::new(false)) {
                Ok(r) => r,
                Err(e) => {
                    error!(error = %e, "Indexing failed");
                    std::process::exit(1);
                }
            };

            println!(
                "Indexed {} file(s), {} chunk(s) in {} ms.",
                report.files_indexed, report.chunks_indexed, report.elapsed_ms
            );
            for err in &report.errors {
                eprintln!("  skipped: {err}");
            }

            if watch_mode {
                if engine.start_watching() {
                    info!("Watching for changes (Ctrl-C to exit)");
                    loop {
                        std::thread::sleep(std::time::Duration::from_secs(3600));
                    }
                } else {
                    error!("Watcher failed to start");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Search {
            query,
            paths,
            index,
            top_k,
            min_score,
            language,
            file_path,
            no_content,
        }) => {
            let engine = open_engine(resolve_config(&paths, index, false));
            if engine.stats().total_chunks == 0 {
                eprintln!("Index is empty — run `ultrafast-index index` first.");
                std::process::exit(1);
            }

            let options = SearchOptions {
                max_results: top_k.max(1),
                min_score,
                language,
                file_path,
                ..Default::default()
            };
            let (processed, results) = engine.search(&query, &options);

            if results.is_empty() {
                println!(
                    "No results for \"{}\" ({} variant(s) tried).",
                    processed.normalized,
                    processed.variants.len()
                );
                return;
            }

            for (i, r) in results.iter().enumerate() {
                println!(
                    "{}. {} [{}] lines {}-{}  score={:.2} relevance={:.2}",
                    i + 1,
                    display_path(&r.path),
                    r.language,
                    r.start_line,
                    r.end_line,
                    r.score,
                    r.relevance,
                );
                if !no_content {
                    if let Some(content) = &r.content {
                        for line in content.lines().take(8) {
                            println!("   | {line}");
                        }
                        if content.lines().count() > 8 {
                            println!("   | …");
                        }
                    }
                }
            }
        }
        Some(Commands::Stats { paths, index }) => {
            let engine = open_engine(resolve_config(&paths, index, false));
            let stats = engine.stats();
            println!("Files:            {}", stats.total_files);
            println!("Chunks:           {}", stats.total_chunks);
            println!("Distinct terms:   {}", stats.distinct_terms);
            println!("Mean terms/chunk: {:.1}", stats.mean_terms_per_chunk);
            println!("Watching:         {}", stats.watching);
            println!("Roots:");
            for root in &stats.roots {
                println!("  {}", display_path(root));
            }
        }
        Some(Commands::Clear { paths, index, yes }) => {
            if !yes {
                eprintln!("Refusing to clear without --yes.");
                std::process::exit(1);
            }
            let engine = open_engine(resolve_config(&paths, index, false));
            if let Err(e) = engine.clear() {
                error!(error = %e, "Clear failed");
                std::process::exit(1);
            }
            println!("Index cleared.");
        }
    }
}
