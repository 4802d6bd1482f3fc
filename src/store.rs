//! Durable processed-id set — append-only text log, one id per line.
//!
//! The log only ever grows. Loading reads every line into a `HashSet`;
//! recording appends a single newline-terminated id. The store itself does
//! not deduplicate; callers check membership before recording.

use std::collections::HashSet;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::error::StorageError;

/// Append-only record of message ids already notified.
#[derive(Debug, Clone)]
pub struct ProcessedStore {
    path: PathBuf,
}

impl ProcessedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load all known ids. An absent file is an empty set, not an error.
    pub async fn load(&self) -> Result<HashSet<String>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }

    /// Append one id to the log, durably.
    ///
    /// A failure here must leave the item unrecorded so the next cycle
    /// retries it; the caller must not mark the item read afterwards.
    pub async fn record(&self, id: &str) -> Result<(), StorageError> {
        let write_err = |e| StorageError::Write {
            path: self.path.clone(),
            source: e,
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_err)?;

        file.write_all(format!("{id}\n").as_bytes())
            .await
            .map_err(write_err)?;
        file.sync_data().await.map_err(write_err)?;

        Ok(())
    }
}
