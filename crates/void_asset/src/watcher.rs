//! File system watcher for content roots

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::error::{AssetError, AssetResult};

/// A file change event
#[derive(Debug, Clone)]
pub struct FileChange {
    /// Path to the changed file or folder
    pub path: PathBuf,
    /// Type of change
    pub kind: FileChangeKind,
}

/// Type of file change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    /// Entry was created
    Created,
    /// Entry was modified or renamed
    Modified,
    /// Entry was deleted
    Deleted,
}

/// Watches content roots; polled by the host
pub struct ContentWatcher {
    watcher: notify::RecommendedWatcher,
    rx: crossbeam_channel::Receiver<notify::Result<Event>>,

    /// Debounce tracking - prevents duplicate events
    debounce: HashMap<PathBuf, Instant>,
    debounce_duration: Duration,
    watch_dirs: Vec<PathBuf>,
}

impl ContentWatcher {
    /// Create a new watcher
    pub fn new() -> AssetResult<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();

        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .map_err(|e| AssetError::Watch(format!("Failed to create file watcher: {}", e)))?;

        Ok(Self {
            watcher,
            rx,
            debounce: HashMap::new(),
            debounce_duration: Duration::from_millis(100),
            watch_dirs: Vec::new(),
        })
    }

    /// Watch a directory recursively, creating it if needed
    pub fn watch(&mut self, dir: impl AsRef<Path>) -> AssetResult<()> {
        let path = dir.as_ref().to_path_buf();

        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| AssetError::io(&path, e))?;
        }

        self.watcher
            .watch(&path, RecursiveMode::Recursive)
            .map_err(|e| AssetError::Watch(format!("Failed to watch {:?}: {}", path, e)))?;

        log::info!("Watching content root: {:?}", path);
        self.watch_dirs.push(path);
        Ok(())
    }

    /// Drain pending changes
    pub fn poll(&mut self) -> Vec<FileChange> {
        let mut changes = Vec::new();
        let now = Instant::now();

        while let Ok(result) = self.rx.try_recv() {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("File watcher error: {}", e);
                    continue;
                }
            };

            let kind = match event.kind {
                EventKind::Create(_) => FileChangeKind::Created,
                EventKind::Modify(_) => FileChangeKind::Modified,
                EventKind::Remove(_) => FileChangeKind::Deleted,
                _ => continue,
            };

            for path in event.paths {
                if let Some(last) = self.debounce.get(&path) {
                    if now.duration_since(*last) < self.debounce_duration {
                        continue;
                    }
                }

                self.debounce.insert(path.clone(), now);
                changes.push(FileChange { path, kind });
            }
        }

        self.debounce.retain(|_, time| now.duration_since(*time) < Duration::from_secs(5));

        changes
    }

    /// Watched directories
    pub fn watch_dirs(&self) -> &[PathBuf] {
        &self.watch_dirs
    }

    /// Set debounce duration
    pub fn set_debounce(&mut self, duration: Duration) {
        self.debounce_duration = duration;
    }
}
