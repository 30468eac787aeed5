//! Standalone dev server backed by the OS file watcher
//!
//! Used by the `dev` command when no bundler is driving the plugin. There are
//! no connected clients, so invalidation and reload messages are logged.

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bundler::{DevServer, DevServerError, HmrMessage, WatchEvent};

type Subscribers = Arc<Mutex<Vec<mpsc::UnboundedSender<WatchEvent>>>>;

pub struct FsDevServer {
    watcher: Mutex<RecommendedWatcher>,
    subscribers: Subscribers,
    watched_dirs: Mutex<HashSet<PathBuf>>,
}

impl FsDevServer {
    pub fn new() -> Result<Self, DevServerError> {
        let subscribers: Subscribers = Arc::default();
        let sink = subscribers.clone();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => broadcast(&sink, event),
            Err(e) => warn!(error = %e, "File watcher error"),
        })
        .map_err(|e| DevServerError::Watcher(e.to_string()))?;

        Ok(Self {
            watcher: Mutex::new(watcher),
            subscribers,
            watched_dirs: Mutex::default(),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn to_watch_events(event: Event) -> Vec<WatchEvent> {
    let make: fn(PathBuf) -> WatchEvent = match event.kind {
        EventKind::Modify(_) => WatchEvent::Changed,
        EventKind::Create(_) => WatchEvent::Added,
        EventKind::Remove(_) => WatchEvent::Removed,
        _ => return Vec::new(),
    };
    event.paths.into_iter().map(make).collect()
}

fn broadcast(subscribers: &Subscribers, event: Event) {
    let events = to_watch_events(event);
    if events.is_empty() {
        return;
    }

    let mut subscribers = lock(subscribers);
    subscribers.retain(|tx| !tx.is_closed());
    for event in events {
        for tx in subscribers.iter() {
            let _ = tx.send(event.clone());
        }
    }
}

#[async_trait]
impl DevServer for FsDevServer {
    /// Watches each file's parent directory, so editors that replace files
    /// on save keep producing events
    async fn watch(&self, paths: &[PathBuf]) -> Result<(), DevServerError> {
        let mut watcher = lock(&self.watcher);
        let mut watched = lock(&self.watched_dirs);

        for path in paths {
            let dir = if path.is_dir() {
                path.as_path()
            } else {
                path.parent().unwrap_or(Path::new("."))
            };
            if watched.contains(dir) {
                continue;
            }

            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| DevServerError::Watch {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                })?;
            debug!(dir = %dir.display(), "Watching directory");
            watched.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<WatchEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    async fn invalidate_all(&self) {
        debug!("Module graph invalidated");
    }

    async fn send(&self, message: HmrMessage) {
        match &message {
            HmrMessage::FullReload => info!("tx3 bindings updated, full reload"),
            HmrMessage::Error { message } => warn!(error = %message, "tx3 bindings are out of date"),
        }
    }
}
