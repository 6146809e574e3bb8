//! Batch-scoped partial site.

use crate::entry::{NavCandidate, OutputEntry, RenderFailure};

/// Search-index contribution of one batch.
///
/// Wrapped in `Option` on [`PartialSite`]: a builder that could not produce
/// postings leaves it absent, and the merger degrades to an entry-only merge
/// with a warning instead of failing the batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchContribution {
    /// Per-document postings, in batch order.
    pub postings: Vec<SearchPosting>,
}

/// Raw per-document search fields before tokenization.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchPosting {
    /// Output path of the document (index key).
    pub output_path: String,
    /// Document title.
    pub title: String,
    /// Aliases from frontmatter.
    pub aliases: Vec<String>,
    /// Headings in document order.
    pub headings: Vec<String>,
    /// Tags from frontmatter.
    pub tags: Vec<String>,
    /// Path string indexed for path-term search.
    pub path: String,
    /// Plain body text.
    pub content: String,
}

/// The complete-but-batch-scoped build result.
///
/// Created by the chunk builder, consumed by
/// [`FinalSite::merge_partial`](crate::FinalSite::merge_partial). Everything in
/// it is scoped to one batch; nothing refers back to other batches.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartialSite {
    /// Index of the batch that produced this partial.
    pub batch_index: usize,
    /// Rendered pages and collected attachments.
    pub entries: Vec<OutputEntry>,
    /// Navigation candidates (nav-visible pages only).
    pub nav_candidates: Vec<NavCandidate>,
    /// Search contribution, absent when the builder could not produce one.
    pub search: Option<SearchContribution>,
    /// Number of documents the batch attempted.
    pub document_count: usize,
    /// Wall-clock build time as seconds since the Unix epoch.
    pub rendered_at: f64,
    /// Documents that failed to render and were skipped.
    pub failures: Vec<RenderFailure>,
}

impl PartialSite {
    /// Create an empty partial for the given batch index.
    #[must_use]
    pub fn new(batch_index: usize) -> Self {
        Self {
            batch_index,
            search: Some(SearchContribution::default()),
            ..Self::default()
        }
    }

    /// Number of page entries.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == crate::EntryKind::Page)
            .count()
    }
}
