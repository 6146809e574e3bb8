//! Document rendering collaborator for the WV export engine.
//!
//! The export pipeline does not interpret content formats. It hands each
//! [`wv_storage::Document`] to a [`DocumentRenderer`] and consumes the result:
//! HTML payload, resolved title, search fields, and the attachment files the
//! content references.
//!
//! # Architecture
//!
//! - [`DocumentRenderer`] trait: the collaborator seam the pipeline calls
//! - [`MarkdownRenderer`]: default implementation over `pulldown-cmark` with
//!   YAML frontmatter and wiki-style embed support
//! - [`RenderedPage`] / [`Attachment`]: results handed back to the pipeline

mod frontmatter;
mod markdown;

use std::path::PathBuf;

use thiserror::Error;
use wv_storage::{Document, VaultError};

pub use frontmatter::Frontmatter;
pub use markdown::MarkdownRenderer;

/// Rendering failure for a single document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    /// The document source could not be loaded from the vault.
    #[error("failed to read document source")]
    Source(#[from] VaultError),
}

/// Result of rendering one document.
///
/// Everything the pipeline needs to place the page, index it for search, and
/// collect its attachments. Paths are vault-relative source paths; output
/// placement is the pipeline's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// Source path of the rendered document.
    pub source: PathBuf,
    /// Rendered HTML body.
    pub html: String,
    /// Resolved title (frontmatter > first H1 > scan title).
    pub title: String,
    /// Heading texts in document order, including the first H1.
    pub headings: Vec<String>,
    /// Aliases declared in frontmatter.
    pub aliases: Vec<String>,
    /// Tags declared in frontmatter.
    pub tags: Vec<String>,
    /// Concatenated body text for full-text indexing.
    pub plain_text: String,
    /// Whether the page participates in site navigation.
    pub show_in_nav: bool,
    /// Vault-relative paths of attachment files the content references.
    pub attachment_refs: Vec<PathBuf>,
}

/// One attachment file collected for a rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Vault-relative source path.
    pub source: PathBuf,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
    /// Source size in bytes.
    pub size: u64,
    /// Modification time as seconds since the Unix epoch.
    pub mtime: f64,
}

/// Rendering collaborator contract.
///
/// Implementations must be thread-safe: the pipeline fans render calls out
/// across a batch.
pub trait DocumentRenderer: Send + Sync {
    /// Render one document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the document cannot be rendered at all.
    /// Partial degradation (unresolvable embeds, bad frontmatter) is handled
    /// internally with warnings instead.
    fn render(&self, document: &Document) -> Result<RenderedPage, RenderError>;

    /// Collect attachment files referenced by a rendered page.
    ///
    /// Missing attachment files are skipped with a warning; they do not fail
    /// the call.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] on backend failures other than missing files.
    fn collect_attachments(&self, page: &RenderedPage) -> Result<Vec<Attachment>, RenderError>;
}
