//! Resumable abort checkpoint.
//!
//! Written once when the governor stops a run at critical memory. Unlike the
//! per-batch progress ledger, the checkpoint carries the document split
//! itself: a resume operation re-enters the pipeline with the remaining
//! paths as its input list, on top of the artifacts the aborted run already
//! finalized.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::ledger::epoch_millis;

/// Checkpoint file name, created inside the destination root.
pub const CHECKPOINT_FILE: &str = ".wv-checkpoint.json";

/// State persisted by a memory-critical abort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeCheckpoint {
    /// Size of the original document list.
    pub total_documents: usize,
    /// Vault-relative paths already exported.
    pub processed_document_paths: Vec<String>,
    /// Vault-relative paths still to export.
    pub remaining_document_paths: Vec<String>,
    /// Batches that completed before the abort.
    pub completed_batches: usize,
    /// Batches the aborted run had planned.
    pub total_batches: usize,
    /// Share of documents processed, 0-100.
    pub completion_percent: f64,
    /// Resident memory at the abort decision, in megabytes.
    #[serde(rename = "abortMemoryMB")]
    pub abort_memory_mb: u64,
    /// Abort time as epoch milliseconds.
    pub timestamp: u64,
    /// Destination root the aborted run was writing into.
    pub destination: String,
}

impl ResumeCheckpoint {
    /// Assemble a checkpoint from the abort-time state.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(
        processed: Vec<String>,
        remaining: Vec<String>,
        completed_batches: usize,
        total_batches: usize,
        abort_memory_mb: u64,
        destination: &Path,
    ) -> Self {
        let total_documents = processed.len() + remaining.len();
        let completion_percent = if total_documents == 0 {
            100.0
        } else {
            processed.len() as f64 / total_documents as f64 * 100.0
        };
        Self {
            total_documents,
            processed_document_paths: processed,
            remaining_document_paths: remaining,
            completed_batches,
            total_batches,
            completion_percent,
            abort_memory_mb,
            timestamp: epoch_millis(),
            destination: destination.display().to_string(),
        }
    }

    /// Checkpoint file path for a destination root.
    #[must_use]
    pub fn path_for(destination: &Path) -> PathBuf {
        destination.join(CHECKPOINT_FILE)
    }

    /// Persist the checkpoint into the destination root.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] when encoding or writing fails.
    pub fn write(&self, destination: &Path) -> Result<(), CheckpointError> {
        let path = Self::path_for(destination);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|source| CheckpointError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load a checkpoint from the destination root.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Missing`] when no checkpoint exists, and
    /// read or decode failures otherwise. Callers decide whether a missing
    /// checkpoint is an error ("resume" with nothing to resume) or routine.
    pub fn load(destination: &Path) -> Result<Self, CheckpointError> {
        let path = Self::path_for(destination);
        let raw = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CheckpointError::Missing {
                    path: path.display().to_string(),
                }
            } else {
                CheckpointError::Read {
                    path: path.display().to_string(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&raw).map_err(|source| CheckpointError::Malformed {
            path: path.display().to_string(),
            source,
        })
    }

    /// Delete the checkpoint file. Missing files are not an error.
    pub fn clear(destination: &Path) {
        let path = Self::path_for(destination);
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %e, "could not remove checkpoint file");
        }
    }
}

/// Checkpoint persistence failure.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("no checkpoint found at {path}")]
    Missing { path: String },
    #[error("cannot read checkpoint {path}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("checkpoint {path} is malformed")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write checkpoint {path}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot encode checkpoint")]
    Encode(#[from] serde_json::Error),
}
