//! JSON Lines unknown-queue log

use super::{UnknownQueueEvent, UnknownQueueSink};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Appends one JSON object per line
///
/// Each event is serialized into a single buffer and written with one
/// `write_all` on an append-mode handle, so concurrent writers never interleave
/// partial lines.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, event: &UnknownQueueEvent) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Recover from poisoning; each write is self-contained
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(&line)
    }
}

impl UnknownQueueSink for JsonlSink {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn deliver(&self, event: &UnknownQueueEvent) {
        if let Err(e) = self.append(event) {
            warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to append unknown queue event"
            );
        }
    }
}
