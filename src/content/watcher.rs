//! Change watching for directory content sources.
//!
//! Watches the content root and reports which section references were
//! touched, so panels showing them can be reloaded.

use super::directory::reference_for_path;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

/// Watches a content directory for edited sections.
#[derive(Debug)]
pub struct ContentWatcher {
    /// The internal notify watcher
    _watcher: RecommendedWatcher,
    /// Receiver for changed file paths
    receiver: Receiver<PathBuf>,
    /// Root path being watched
    root: PathBuf,
}

impl ContentWatcher {
    /// Start watching `root` recursively.
    ///
    /// Returns an error message if the watcher cannot be created.
    pub fn new(root: &Path) -> Result<Self, String> {
        let (tx, rx) = channel();

        let watcher_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                Self::handle_event(result, &watcher_tx);
            },
            Config::default().with_poll_interval(Duration::from_millis(500)),
        )
        .map_err(|e| format!("Failed to create content watcher: {}", e))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| format!("Failed to watch {}: {}", root.display(), e))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            root: root.to_path_buf(),
        })
    }

    /// Forward paths of created, modified or removed files.
    fn handle_event(result: Result<Event, notify::Error>, tx: &Sender<PathBuf>) {
        match result {
            Ok(event) => {
                if matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
            }
            Err(e) => log::warn!("Content watcher error: {}", e),
        }
    }

    /// Section references changed since the last poll, deduplicated.
    ///
    /// This is non-blocking.
    pub fn poll_changed_sections(&self) -> Vec<String> {
        let mut paths = Vec::new();
        while let Ok(path) = self.receiver.try_recv() {
            paths.push(path);
        }
        changed_sections(&self.root, paths)
    }
}

/// Map changed paths to the distinct section references they serve.
fn changed_sections(root: &Path, paths: impl IntoIterator<Item = PathBuf>) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    for path in paths {
        if let Some(reference) = reference_for_path(root, &path) {
            if !sections.contains(&reference) {
                sections.push(reference);
            }
        }
    }
    sections
}
