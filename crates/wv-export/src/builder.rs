//! Per-batch site construction.
//!
//! One builder serves the whole run. It holds the rendering collaborator
//! and the globally resolved path root; every batch build applies that same
//! root, which is what keeps a chunked run's output paths identical to an
//! unchunked one. Documents within a batch render in parallel; the partial
//! site is assembled in batch order afterwards.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};
use wv_render::{Attachment, DocumentRenderer};
use wv_site::{EntryKind, NavCandidate, OutputEntry, PartialSite, RenderFailure, SearchPosting};
use wv_storage::Document;

use crate::paths;
use crate::roots::PathRoot;

/// Batch build failure.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Not one document in the batch produced output. Recoverable: the
    /// caller splits the batch into smaller pieces and retries before
    /// giving the documents up as failed.
    #[error("no document in the batch could be rendered")]
    AllDocumentsFailed {
        /// Per-document failures, in batch order.
        failures: Vec<RenderFailure>,
    },
}

/// Builds one self-consistent partial site per batch.
pub struct ChunkBuilder {
    renderer: Arc<dyn DocumentRenderer>,
    root: PathRoot,
}

/// Per-document build result, assembled after the parallel phase.
enum DocOutcome {
    Rendered(Box<RenderedDoc>),
    Failed(RenderFailure),
}

struct RenderedDoc {
    entries: Vec<OutputEntry>,
    candidate: Option<NavCandidate>,
    posting: SearchPosting,
}

impl ChunkBuilder {
    /// Create a builder with the run's renderer and global root.
    #[must_use]
    pub fn new(renderer: Arc<dyn DocumentRenderer>, root: PathRoot) -> Self {
        Self { renderer, root }
    }

    /// The root injected into every batch.
    #[must_use]
    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    /// Build one batch into a partial site.
    ///
    /// A single document's failure records it and moves on; the batch
    /// succeeds with what rendered.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::AllDocumentsFailed`] when a non-empty batch
    /// produced no output at all.
    pub fn build(
        &self,
        batch_index: usize,
        documents: &[Document],
    ) -> Result<PartialSite, BuildError> {
        let outcomes: Vec<DocOutcome> = documents
            .par_iter()
            .map(|document| self.build_document(document))
            .collect();

        let mut partial = PartialSite::new(batch_index);
        partial.document_count = documents.len();
        partial.rendered_at = now_seconds();

        let mut seen_paths: HashSet<String> = HashSet::new();
        let mut rendered = 0usize;
        for outcome in outcomes {
            match outcome {
                DocOutcome::Rendered(doc) => {
                    rendered += 1;
                    for entry in doc.entries {
                        // Two documents can reference the same attachment.
                        if seen_paths.insert(entry.output_path.clone()) {
                            partial.entries.push(entry);
                        }
                    }
                    if let Some(candidate) = doc.candidate {
                        partial.nav_candidates.push(candidate);
                    }
                    if let Some(search) = partial.search.as_mut() {
                        search.postings.push(doc.posting);
                    }
                }
                DocOutcome::Failed(failure) => {
                    warn!(
                        path = %failure.source_path,
                        reason = %failure.reason,
                        "document skipped"
                    );
                    partial.failures.push(failure);
                }
            }
        }

        if rendered == 0 && !documents.is_empty() {
            return Err(BuildError::AllDocumentsFailed {
                failures: partial.failures,
            });
        }

        debug!(
            batch = batch_index,
            documents = documents.len(),
            rendered,
            failed = partial.failures.len(),
            "partial site built"
        );
        Ok(partial)
    }

    fn build_document(&self, document: &Document) -> DocOutcome {
        let source_path = document.path_str();
        let page = match self.renderer.render(document) {
            Ok(page) => page,
            Err(e) => {
                return DocOutcome::Failed(RenderFailure {
                    source_path,
                    reason: e.to_string(),
                });
            }
        };

        // Collect before taking the page apart; a backend failure here
        // degrades to a page without its attachments.
        let attachments = match self.renderer.collect_attachments(&page) {
            Ok(attachments) => attachments,
            Err(e) => {
                warn!(path = %source_path, error = %e, "attachments skipped for page");
                Vec::new()
            }
        };

        let output_path = paths::page_output_path(&self.root, &source_path);
        let candidate = page.show_in_nav.then(|| NavCandidate {
            path: output_path.clone(),
            title: page.title.clone(),
        });

        let mut entries = vec![OutputEntry {
            output_path: output_path.clone(),
            kind: EntryKind::Page,
            source_path: document.path.clone(),
            title: page.title.clone(),
            show_in_nav: page.show_in_nav,
            source_size: document.size,
            created: document.mtime,
            modified: document.mtime,
            bytes: page.html.into_bytes(),
        }];
        for attachment in attachments {
            entries.push(self.attachment_entry(attachment));
        }

        let posting = SearchPosting {
            output_path,
            title: page.title,
            aliases: page.aliases,
            headings: page.headings,
            tags: page.tags,
            path: source_path,
            content: page.plain_text,
        };

        DocOutcome::Rendered(Box::new(RenderedDoc {
            entries,
            candidate,
            posting,
        }))
    }

    fn attachment_entry(&self, attachment: Attachment) -> OutputEntry {
        let source_str = attachment.source.to_string_lossy().replace('\\', "/");
        let title = attachment.source.file_name().map_or_else(
            || source_str.clone(),
            |name| name.to_string_lossy().into_owned(),
        );
        OutputEntry {
            output_path: paths::attachment_output_path(&self.root, &source_str),
            kind: EntryKind::Attachment,
            source_path: attachment.source,
            title,
            show_in_nav: false,
            source_size: attachment.size,
            created: attachment.mtime,
            modified: attachment.mtime,
            bytes: attachment.bytes,
        }
    }
}

/// Seconds since the Unix epoch.
fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use wv_render::MarkdownRenderer;
    use wv_storage::{MockVault, VaultStorage};

    use super::*;

    fn builder_for(vault: MockVault, root: &str) -> ChunkBuilder {
        let renderer = Arc::new(MarkdownRenderer::new(Arc::new(vault)));
        ChunkBuilder::new(renderer, PathRoot::from_recorded(root))
    }

    fn missing_doc(path: &str) -> Document {
        Document {
            path: PathBuf::from(path),
            title: path.to_owned(),
            size: 0,
            mtime: 0.0,
        }
    }

    #[test]
    fn test_build_applies_injected_root() {
        let vault = MockVault::new().with_document("Vault/A/My Note.md", "# My Note\n\nBody.");
        let docs = vault.scan().unwrap();
        let builder = builder_for(vault, "Vault");

        let partial = builder.build(0, &docs).unwrap();

        assert_eq!(partial.entries.len(), 1);
        assert_eq!(partial.entries[0].output_path, "a/my-note.html");
        assert_eq!(partial.entries[0].kind, EntryKind::Page);
        assert_eq!(partial.entries[0].title, "My Note");
        assert!(String::from_utf8(partial.entries[0].bytes.clone())
            .unwrap()
            .contains("<h1>"));
    }

    #[test]
    fn test_build_collects_attachments() {
        let vault = MockVault::new()
            .with_document("Vault/A/x.md", "# X\n\n![[img.png]]")
            .with_attachment("Vault/A/img.png", vec![1, 2, 3]);
        let docs = vault.scan().unwrap();
        let builder = builder_for(vault, "Vault");

        let partial = builder.build(0, &docs).unwrap();

        let attachment = partial
            .entries
            .iter()
            .find(|e| e.kind == EntryKind::Attachment)
            .unwrap();
        assert_eq!(attachment.output_path, "a/img.png");
        assert_eq!(attachment.bytes, vec![1, 2, 3]);
        assert!(!attachment.show_in_nav);
    }

    #[test]
    fn test_build_dedups_shared_attachment() {
        let vault = MockVault::new()
            .with_document("A/x.md", "# X\n\n![[shared.png]]")
            .with_document("B/y.md", "# Y\n\n![[shared.png]]")
            .with_attachment("shared.png", vec![9]);
        let docs = vault.scan().unwrap();
        let builder = builder_for(vault, "");

        let partial = builder.build(0, &docs).unwrap();

        let attachment_count = partial
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Attachment)
            .count();
        assert_eq!(attachment_count, 1);
        assert_eq!(partial.entries.len(), 3);
    }

    #[test]
    fn test_build_skips_failed_document() {
        let vault = MockVault::new().with_document("a/good.md", "# Good\n\nText.");
        let mut docs = vault.scan().unwrap();
        docs.push(missing_doc("a/gone.md"));
        let builder = builder_for(vault, "");

        let partial = builder.build(0, &docs).unwrap();

        assert_eq!(partial.entries.len(), 1);
        assert_eq!(partial.failures.len(), 1);
        assert_eq!(partial.failures[0].source_path, "a/gone.md");
        assert_eq!(partial.document_count, 2);
    }

    #[test]
    fn test_build_all_failed_is_error() {
        let vault = MockVault::new();
        let docs = vec![missing_doc("a.md"), missing_doc("b.md")];
        let builder = builder_for(vault, "");

        let err = builder.build(0, &docs).unwrap_err();

        let BuildError::AllDocumentsFailed { failures } = err;
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn test_build_empty_batch_is_empty_partial() {
        let builder = builder_for(MockVault::new(), "");

        let partial = builder.build(3, &[]).unwrap();

        assert!(partial.entries.is_empty());
        assert!(partial.failures.is_empty());
        assert_eq!(partial.batch_index, 3);
    }

    #[test]
    fn test_build_nav_candidate_respects_publish_flag() {
        let vault = MockVault::new()
            .with_document("a/visible.md", "# Visible\n\nText.")
            .with_document("a/hidden.md", "---\npublish: false\n---\n# Hidden\n\nText.");
        let docs = vault.scan().unwrap();
        let builder = builder_for(vault, "");

        let partial = builder.build(0, &docs).unwrap();

        let candidate_paths: Vec<_> = partial
            .nav_candidates
            .iter()
            .map(|c| c.path.as_str())
            .collect();
        assert_eq!(candidate_paths, vec!["a/visible.html"]);
        let hidden = partial
            .entries
            .iter()
            .find(|e| e.output_path == "a/hidden.html")
            .unwrap();
        assert!(!hidden.show_in_nav);
    }

    #[test]
    fn test_build_search_posting_fields() {
        let vault = MockVault::new().with_document(
            "notes/topic.md",
            "---\naliases: [Alt Name]\ntags: [docs]\n---\n# Topic\n\n## Detail\n\nBody words here.",
        );
        let docs = vault.scan().unwrap();
        let builder = builder_for(vault, "");

        let partial = builder.build(0, &docs).unwrap();

        let posting = &partial.search.as_ref().unwrap().postings[0];
        assert_eq!(posting.output_path, "notes/topic.html");
        assert_eq!(posting.title, "Topic");
        assert_eq!(posting.aliases, vec!["Alt Name"]);
        assert_eq!(posting.headings, vec!["Topic", "Detail"]);
        assert_eq!(posting.tags, vec!["docs"]);
        assert_eq!(posting.path, "notes/topic.md");
        assert!(posting.content.contains("Body words here"));
    }
}
