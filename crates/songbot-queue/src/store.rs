use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::entry::{Queue, QueueEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to serialize queue")]
    Serialize(#[source] serde_json::Error),
    #[error("Failed to write queue to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Persists the queue as a JSON array of entries.
#[derive(Debug, Clone)]
pub struct QueueStore {
    path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file the queue is stored in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the queue.
    ///
    /// A missing or unreadable file is treated as an empty queue.
    pub fn load(&self) -> Queue {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No queue at {}, starting empty", self.path.display());
                return Queue::new();
            }
            Err(e) => {
                common::log_warn!(e, "Failed to read queue from {}", self.path.display());
                return Queue::new();
            }
        };

        match serde_json::from_slice::<Vec<QueueEntry>>(&bytes) {
            Ok(entries) => {
                let queue = Queue::from_entries(entries);
                tracing::info!("Loaded {} queued request(s)", queue.len());
                queue
            }
            Err(e) => {
                common::log_warn!(e, "Ignoring malformed queue in {}", self.path.display());
                Queue::new()
            }
        }
    }

    /// Save the queue.
    ///
    /// The new content is written next to the old file and renamed over it,
    /// so a crash never leaves a partially written queue behind.
    pub fn save(&self, queue: &Queue) -> Result<(), StoreError> {
        let entries = queue.iter().collect::<Vec<_>>();
        let bytes = serde_json::to_vec_pretty(&entries).map_err(StoreError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                fs::create_dir_all(parent).map_err(|source| self.write_error(source))?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|source| self.write_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.write_error(source))?;
        Ok(())
    }

    fn write_error(&self, source: io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}
