//! Batch-scoped output types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of an output entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A rendered document page.
    Page,
    /// A collected attachment file.
    Attachment,
}

/// One rendered page or collected attachment destined for the output layout.
///
/// Owned by the batch that created it until merged; the payload is written
/// through the sink during merge and not retained afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputEntry {
    /// Site-relative output path (e.g. `notes/topic/page.html`).
    pub output_path: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Vault-relative source path.
    pub source_path: PathBuf,
    /// Display title (page title, or file name for attachments).
    pub title: String,
    /// Whether the entry participates in navigation.
    pub show_in_nav: bool,
    /// Source size in bytes.
    pub source_size: u64,
    /// Source creation time as seconds since the Unix epoch.
    pub created: f64,
    /// Source modification time as seconds since the Unix epoch.
    pub modified: f64,
    /// Payload bytes, drained at merge time.
    pub bytes: Vec<u8>,
}

/// One navigation-tree candidate produced by a batch.
///
/// Candidates are deduplicated by output path during merge; the tree itself
/// is rebuilt only after every batch has merged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavCandidate {
    /// Site-relative output path.
    pub path: String,
    /// Display title.
    pub title: String,
}

/// A document that failed to render and was skipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderFailure {
    /// Vault-relative source path.
    pub source_path: String,
    /// Human-readable failure reason.
    pub reason: String,
}
