//! File watcher for incremental live re-indexing.
//!
//! Wraps a `notify` recursive watcher per project root. Raw events are
//! debounced per path with a quiet window; only the debounced stream reaches
//! the engine, as [`FsEvent`] messages through a callback. The watcher never
//! touches engine state directly.

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Debounce window: wait this long after the last event before dispatching.
pub const DEBOUNCE_MS: u64 = 500;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsEventKind {
    Add,
    Change,
    Delete,
}

/// A debounced filesystem event for one path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
}

// ---------------------------------------------------------------------------
// Debouncer — pure, testable
// ---------------------------------------------------------------------------

/// Per-path debouncer. A new event for a path restarts its timer; the
/// latest kind wins (a delete after a change is a delete).
pub struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, (Instant, FsEventKind)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: HashMap::new() }
    }

    pub fn record(&mut self, event: FsEvent, now: Instant) {
        self.pending.insert(event.path, (now, event.kind));
    }

    /// Events whose quiet window has elapsed, ordered by path.
    pub fn drain_ready(&mut self, now: Instant) -> Vec<FsEvent> {
        let ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (t, _))| now.duration_since(*t) >= self.window)
            .map(|(p, _)| p.clone())
            .collect();

        let mut events: Vec<FsEvent> = ready
            .into_iter()
            .filter_map(|path| {
                self.pending.remove(&path).map(|(_, kind)| FsEvent { kind, path })
            })
            .collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Watcher state machine
// ---------------------------------------------------------------------------

/// `Ready` is the only state that dispatches events. `start` in `Ready` and
/// `stop` in `Stopped` are no-ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchState {
    Stopped,
    Starting,
    Ready,
    Stopping,
}

// ---------------------------------------------------------------------------
// FileWatcher
// ---------------------------------------------------------------------------

/// Owns the OS watcher and the debounce thread for a set of roots.
pub struct FileWatcher {
    roots: Vec<PathBuf>,
    state: Arc<Mutex<WatchState>>,
    watcher: Option<RecommendedWatcher>,
    shutdown: Arc<AtomicBool>,
}

impl FileWatcher {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            state: Arc::new(Mutex::new(WatchState::Stopped)),
            watcher: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> WatchState {
        *self.state.lock().unwrap()
    }

    /// Begin watching. `filter` decides which paths are interesting (the
    /// engine passes its walker filter so both enforce the same exclusions);
    /// `on_events` receives each debounced batch. Idempotent: returns
    /// `true` if the watcher is running afterwards.
    pub fn start<F, G>(&mut self, filter: F, on_events: G) -> bool
    where
        F: Fn(&Path) -> bool + Send + 'static,
        G: Fn(Vec<FsEvent>) + Send + 'static,
    {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                WatchState::Ready | WatchState::Starting => return true,
                WatchState::Stopping => return false,
                WatchState::Stopped => *state = WatchState::Starting,
            }
        }

        let (tx, rx) = mpsc::channel::<FsEvent>();
        let mut watcher = match RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                let Ok(event) = res else { return };
                let kind = match event.kind {
                    EventKind::Create(_) => FsEventKind::Add,
                    EventKind::Modify(_) => FsEventKind::Change,
                    EventKind::Remove(_) => FsEventKind::Delete,
                    _ => return,
                };
                for path in event.paths {
                    let _ = tx.send(FsEvent { kind, path });
                }
            },
            notify::Config::default(),
        ) {
            Ok(w) => w,
            Err(e) => {
                warn!(error = %e, "Failed to create file watcher");
                *self.state.lock().unwrap() = WatchState::Stopped;
                return false;
            }
        };

        let mut watching_any = false;
        for root in &self.roots {
            match watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => {
                    info!(root = %root.display(), "Watching");
                    watching_any = true;
                }
                Err(e) => warn!(root = %root.display(), error = %e, "Failed to watch root"),
            }
        }
        if !watching_any {
            *self.state.lock().unwrap() = WatchState::Stopped;
            return false;
        }

        self.shutdown.store(false, Ordering::SeqCst);
        let shutdown = Arc::clone(&self.shutdown);
        let state = Arc::clone(&self.state);
        std::thread::spawn(move || {
            debounce_loop(rx, shutdown, filter, on_events);
            // Thread exit completes any in-flight stop.
            let mut s = state.lock().unwrap();
            if *s == WatchState::Stopping {
                *s = WatchState::Stopped;
            }
        });

        self.watcher = Some(watcher);
        *self.state.lock().unwrap() = WatchState::Ready;
        true
    }

    /// Stop watching. Idempotent.
    pub fn stop(&mut self) {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                WatchState::Stopped | WatchState::Stopping => return,
                WatchState::Starting | WatchState::Ready => *state = WatchState::Stopping,
            }
        }
        self.shutdown.store(true, Ordering::SeqCst);
        // Dropping the OS watcher closes the channel; the debounce thread
        // drains and marks Stopped.
        self.watcher = None;
        *self.state.lock().unwrap() = WatchState::Stopped;
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Collect raw events and dispatch debounced batches until shutdown.
fn debounce_loop<F, G>(
    rx: mpsc::Receiver<FsEvent>,
    shutdown: Arc<AtomicBool>,
    filter: F,
    on_events: G,
) where
    F: Fn(&Path) -> bool,
    G: Fn(Vec<FsEvent>),
{
    let mut debouncer = Debouncer::new(Duration::from_millis(DEBOUNCE_MS));
    // Poll in sub-window slices so ready events dispatch promptly.
    let poll = Duration::from_millis(DEBOUNCE_MS / 5);

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match rx.recv_timeout(poll) {
            Ok(event) => {
                // Deletions cannot be filtered by metadata; pass paths the
                // filter rejects only when they are gone from disk.
                if filter(&event.path) || (event.kind == FsEventKind::Delete && !event.path.exists())
                {
                    debouncer.record(event, Instant::now());
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        let ready = debouncer.drain_ready(Instant::now());
        if !ready.is_empty() {
            on_events(ready);
        }
    }

    // Final drain so a stop right after a burst does not drop updates.
    let ready = debouncer.drain_ready(Instant::now() + Duration::from_millis(DEBOUNCE_MS));
    if !ready.is_empty() {
        on_events(ready);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: FsEventKind, path: &str) -> FsEvent {
        FsEvent { kind, path: PathBuf::from(path) }
    }

    #[test]
    fn debouncer_holds_until_quiet_window_elapses() {
        let mut d = Debouncer::new(Duration::from_millis(500));
        let t0 = Instant::now();
        d.record(event(FsEventKind::Change, "/p/a.ts"), t0);

        assert!(d.drain_ready(t0 + Duration::from_millis(100)).is_empty());
        let ready = d.drain_ready(t0 + Duration::from_millis(600));
        assert_eq!(ready.len(), 1);
        assert!(d.is_empty());
    }

    #[test]
    fn repeated_events_coalesce_to_one() {
        let mut d = Debouncer::new(Duration::from_millis(500));
        let t0 = Instant::now();
        d.record(event(FsEventKind::Change, "/p/a.ts"), t0);
        d.record(event(FsEventKind::Change, "/p/a.ts"), t0 + Duration::from_millis(200));

        // The second event restarted the timer.
        assert!(d.drain_ready(t0 + Duration::from_millis(600)).is_empty());
        let ready = d.drain_ready(t0 + Duration::from_millis(800));
        assert_eq!(ready.len(), 1);
    }

    #[test]
    fn latest_kind_wins() {
        let mut d = Debouncer::new(Duration::from_millis(500));
        let t0 = Instant::now();
        d.record(event(FsEventKind::Change, "/p/a.ts"), t0);
        d.record(event(FsEventKind::Delete, "/p/a.ts"), t0 + Duration::from_millis(100));

        let ready = d.drain_ready(t0 + Duration::from_millis(700));
        assert_eq!(ready[0].kind, FsEventKind::Delete);
    }

    #[test]
    fn drained_batches_are_path_ordered() {
        let mut d = Debouncer::new(Duration::from_millis(500));
        let t0 = Instant::now();
        d.record(event(FsEventKind::Add, "/p/z.ts"), t0);
        d.record(event(FsEventKind::Add, "/p/a.ts"), t0);

        let ready = d.drain_ready(t0 + Duration::from_millis(600));
        assert_eq!(ready.len(), 2);
        assert!(ready[0].path < ready[1].path);
    }

    #[test]
    fn state_machine_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = FileWatcher::new(vec![dir.path().to_path_buf()]);
        assert_eq!(w.state(), WatchState::Stopped);

        w.stop();
        assert_eq!(w.state(), WatchState::Stopped);

        let started = w.start(|_| true, |_| {});
        assert!(started);
        assert_eq!(w.state(), WatchState::Ready);

        // Second start is a no-op.
        assert!(w.start(|_| true, |_| {}));
        assert_eq!(w.state(), WatchState::Ready);

        w.stop();
        assert_eq!(w.state(), WatchState::Stopped);
        w.stop();
        assert_eq!(w.state(), WatchState::Stopped);
    }

    #[test]
    fn nonexistent_root_fails_to_start() {
        let mut w = FileWatcher::new(vec![PathBuf::from("/definitely/not/here/xyz")]);
        assert!(!w.start(|_| true, |_| {}));
        assert_eq!(w.state(), WatchState::Stopped);
    }
}
