//! Destination write seam.
//!
//! Accepted entries are flushed through a [`SiteSink`] at merge time, so the
//! accumulator never holds payload bytes for merged entries. A sink failure
//! is fatal to the run: an unwritable destination cannot produce a valid
//! site.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Destination write failure.
#[derive(Debug, Error)]
#[error("failed to write {path}: {source}")]
pub struct SinkError {
    /// Destination-relative path of the failed write.
    pub path: String,
    /// Underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

/// Write abstraction over the destination.
///
/// Paths are site-relative with `/` separators; implementations own the
/// mapping to their actual destination.
pub trait SiteSink: Send + Sync {
    /// Ensure the destination root exists and is writable.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the root cannot be created.
    fn ensure_root(&self) -> Result<(), SinkError>;

    /// Write one output file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the write fails.
    fn write(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SinkError>;
}

/// Filesystem sink writing under a destination root.
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    /// Create a sink for the given destination root.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Destination root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SiteSink for FsSink {
    fn ensure_root(&self) -> Result<(), SinkError> {
        fs::create_dir_all(&self.root).map_err(|source| SinkError {
            path: self.root.to_string_lossy().into_owned(),
            source,
        })
    }

    fn write(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SinkError> {
        let target = self.root.join(relative_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| SinkError {
                path: relative_path.to_owned(),
                source,
            })?;
        }
        fs::write(&target, bytes).map_err(|source| SinkError {
            path: relative_path.to_owned(),
            source,
        })
    }
}

/// In-memory sink for dry runs and tests.
///
/// Collects written files in a map; nothing touches the filesystem.
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    /// Create an empty in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths written so far, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    /// Bytes written for a path, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// Number of files written.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    /// True when nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SiteSink for MemorySink {
    fn ensure_root(&self) -> Result<(), SinkError> {
        Ok(())
    }

    fn write(&self, relative_path: &str, bytes: &[u8]) -> Result<(), SinkError> {
        self.files
            .lock()
            .unwrap()
            .insert(relative_path.to_owned(), bytes.to_vec());
        Ok(())
    }
}
