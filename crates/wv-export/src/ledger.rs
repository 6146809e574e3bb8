//! Run progress persistence.
//!
//! The ledger is the commit record of the sequential loop: after every
//! merged batch it is rewritten synchronously, so an interruption between
//! batches loses at most one batch of work. Reads are lenient (a corrupt or
//! stale ledger just means "no prior progress"); writes are not, because a
//! ledger that cannot be written breaks the resume guarantee mid-run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};
use wv_storage::Document;

/// Progress file name, created inside the destination root.
pub const PROGRESS_FILE: &str = ".wv-progress.json";

/// Age beyond which a loaded record is treated as untrustworthy.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Persisted run state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Total batches in the partition.
    pub total_batches: usize,
    /// Indices of batches that have fully merged.
    pub completed_batches: Vec<usize>,
    /// Destination root the run writes into.
    pub destination: String,
    /// Last update as epoch milliseconds.
    pub timestamp: u64,
    /// Documents in the set this record belongs to.
    pub document_count: usize,
    /// Content fingerprint of the document set.
    pub fingerprint: String,
}

impl ProgressRecord {
    /// Fresh record for a run over `documents`.
    #[must_use]
    pub fn new(total_batches: usize, destination: &Path, documents: &[Document]) -> Self {
        Self {
            total_batches,
            completed_batches: Vec::new(),
            destination: destination.display().to_string(),
            timestamp: epoch_millis(),
            document_count: documents.len(),
            fingerprint: fingerprint(documents),
        }
    }

    /// Mark one batch as merged and refresh the timestamp.
    pub fn mark_completed(&mut self, batch_index: usize) {
        if !self.completed_batches.contains(&batch_index) {
            self.completed_batches.push(batch_index);
        }
        self.timestamp = epoch_millis();
    }

    #[must_use]
    pub fn is_completed(&self, batch_index: usize) -> bool {
        self.completed_batches.contains(&batch_index)
    }
}

/// Ledger write failure. Fatal to the run; without a trustworthy ledger an
/// interruption could merge against the wrong state.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot write progress file {path}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot encode progress record")]
    Encode(#[from] serde_json::Error),
}

/// File-backed progress ledger.
pub struct ProgressLedger {
    path: PathBuf,
    max_age: Duration,
}

impl ProgressLedger {
    /// Ledger for a destination root.
    #[must_use]
    pub fn new(destination: &Path) -> Self {
        Self {
            path: destination.join(PROGRESS_FILE),
            max_age: DEFAULT_MAX_AGE,
        }
    }

    /// Override the staleness bound.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Path of the progress file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the ledger synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] when the record cannot be encoded or the file
    /// cannot be written.
    pub fn record(&self, record: &ProgressRecord) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, json).map_err(|source| LedgerError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        debug!(
            completed = record.completed_batches.len(),
            total = record.total_batches,
            "progress recorded"
        );
        Ok(())
    }

    /// Load the persisted record, if a readable one exists.
    #[must_use]
    pub fn load(&self) -> Option<ProgressRecord> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt progress file");
                None
            }
        }
    }

    /// Check a loaded record against the current document set.
    ///
    /// Valid only when the document count and fingerprint match and the
    /// record is not stale. An invalid record means restart from batch 0
    /// rather than risk merging against a different document set.
    #[must_use]
    pub fn is_valid(&self, record: &ProgressRecord, documents: &[Document]) -> bool {
        if record.document_count != documents.len() {
            warn!(
                recorded = record.document_count,
                current = documents.len(),
                "progress file is for a different document count"
            );
            return false;
        }
        if record.fingerprint != fingerprint(documents) {
            warn!("progress file is for a different document set");
            return false;
        }
        let age_ms = epoch_millis().saturating_sub(record.timestamp);
        if u128::from(age_ms) > self.max_age.as_millis() {
            warn!(age_ms, "progress file is stale");
            return false;
        }
        true
    }

    /// Delete the progress file. Missing files are not an error.
    pub fn clear(&self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "could not remove progress file");
        }
    }
}

/// Content fingerprint of a document set: count plus a path-set digest.
///
/// Paths are sorted first so the fingerprint does not depend on scan order.
#[must_use]
pub fn fingerprint(documents: &[Document]) -> String {
    let mut paths: Vec<String> = documents.iter().map(Document::path_str).collect();
    paths.sort_unstable();

    let mut hasher = Sha256::new();
    for path in &paths {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hex::encode(hasher.finalize());
    format!("{}-{}", documents.len(), &digest[..16])
}

/// Milliseconds since the Unix epoch.
pub(crate) fn epoch_millis() -> u64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
