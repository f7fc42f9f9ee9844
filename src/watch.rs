//! Mtime-keyed file watcher.
//!
//! The radio transport drops each received uplink file into a results
//! directory; a watcher polls the file's modification time and hands
//! the content to its parser whenever the time advances. Polling (not
//! inotify) on purpose: the transport rewrites files in place over NFS
//! and SD media where change notification is unreliable, and a 1 s poll
//! is far below the radio duty cycle anyway.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Watches one file for modification-time changes.
///
/// `poll` is cheap when nothing changed (one `stat`); the file is read
/// only after the mtime advances. A missing file is not an error — the
/// transport may simply not have delivered anything yet.
pub struct FileWatcher {
    path: PathBuf,
    last_mtime: Option<SystemTime>,
}

impl FileWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_mtime: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One poll cycle. Returns the file content when the modification
    /// time advanced since the previous poll (the first sighting of the
    /// file counts as a change), `None` otherwise.
    pub fn poll(&mut self) -> Option<String> {
        let mtime = std::fs::metadata(&self.path)
            .and_then(|meta| meta.modified())
            .ok()?;

        if self.last_mtime.is_some_and(|seen| mtime <= seen) {
            return None;
        }
        self.last_mtime = Some(mtime);

        match std::fs::read_to_string(&self.path) {
            Ok(content) => Some(content),
            Err(err) => {
                // Mtime already advanced; the next rewrite will trigger
                // a fresh poll, so just log and skip this cycle.
                log::warn!("watcher: could not read {}: {err}", self.path.display());
                None
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
