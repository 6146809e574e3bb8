//! Shared path-root resolution.
//!
//! The root decides how much of each document's directory structure survives
//! in the output layout. It is resolved exactly once, over the full document
//! list, before any batching, and the same value is injected into every
//! batch build. Resolving per batch is wrong: a batch subset generally has a
//! longer common prefix than the full set, which would strip too much and
//! collide output paths across batches.

use wv_storage::Document;

/// The common ancestor path stripped from every output path.
///
/// Empty when the document set has no shared top-level segment; in that case
/// nothing is stripped and every document keeps its full relative path, so
/// unrelated top-level folders with colliding basenames stay distinct.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathRoot(String);

impl PathRoot {
    /// Resolve the shared root over the full document list.
    ///
    /// Takes the longest common segment prefix of every document path, then
    /// drops the final prefix segment when some document has no segment
    /// beyond it (the "folder" is actually that document's own leaf name).
    /// A single-document list therefore resolves to the document's parent
    /// directory sequence.
    #[must_use]
    pub fn resolve(documents: &[Document]) -> Self {
        let Some(first) = documents.first() else {
            return Self::empty();
        };

        let first_path = first.path_str();
        let mut common: Vec<&str> = first_path.split('/').collect();
        let rest: Vec<String> = documents[1..].iter().map(Document::path_str).collect();
        for path in &rest {
            let segments: Vec<&str> = path.split('/').collect();
            let matched = common
                .iter()
                .zip(&segments)
                .take_while(|(a, b)| a == b)
                .count();
            common.truncate(matched);
            if common.is_empty() {
                return Self::empty();
            }
        }

        // The prefix may end in a leaf name rather than a shared folder:
        // any document whose whole path equals the prefix has no deeper
        // segment, so that last segment cannot be stripped.
        let prefix_len = common.len();
        if documents
            .iter()
            .any(|d| d.path_str().split('/').count() == prefix_len)
        {
            common.pop();
        }

        Self(common.join("/"))
    }

    /// The empty root: nothing is stripped.
    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Rebuild a root recorded by a previous run (manifest `rootPath`).
    ///
    /// A resumed run must reuse the original global root: re-resolving over
    /// the remaining-document subset could yield a deeper prefix and move
    /// outputs relative to the first run's layout.
    #[must_use]
    pub fn from_recorded(root: impl Into<String>) -> Self {
        Self(root.into())
    }

    /// The root as a `/`-separated string, empty when no root exists.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no shared root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Strip the root prefix from a vault-relative path.
    ///
    /// Paths outside the root pass through unchanged; attachments resolved
    /// from folders above the document root legitimately fall outside it and
    /// keep their full relative path.
    #[must_use]
    pub fn strip<'a>(&self, path: &'a str) -> &'a str {
        if self.0.is_empty() {
            return path;
        }
        match path.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.strip_prefix('/').unwrap_or(path),
            None => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    fn doc(path: &str) -> Document {
        Document {
            path: PathBuf::from(path),
            title: path.to_owned(),
            size: 0,
            mtime: 0.0,
        }
    }

    #[test]
    fn test_resolve_no_shared_segment_is_empty() {
        let docs = vec![doc("Korean/A/x.md"), doc("English/B/y.md")];

        assert_eq!(PathRoot::resolve(&docs), PathRoot::empty());
    }

    #[test]
    fn test_resolve_single_shared_segment() {
        let docs = vec![doc("Vault/A/x.md"), doc("Vault/B/y.md")];

        assert_eq!(PathRoot::resolve(&docs).as_str(), "Vault");
    }

    #[test]
    fn test_resolve_deep_shared_prefix() {
        let docs = vec![
            doc("Vault/Notes/Work/a.md"),
            doc("Vault/Notes/Work/b.md"),
            doc("Vault/Notes/Work/sub/c.md"),
        ];

        assert_eq!(PathRoot::resolve(&docs).as_str(), "Vault/Notes/Work");
    }

    #[test]
    fn test_resolve_single_document_uses_parent_sequence() {
        let docs = vec![doc("Vault/Notes/page.md")];

        assert_eq!(PathRoot::resolve(&docs).as_str(), "Vault/Notes");
    }

    #[test]
    fn test_resolve_single_document_at_top_level() {
        let docs = vec![doc("page.md")];

        assert_eq!(PathRoot::resolve(&docs), PathRoot::empty());
    }

    #[test]
    fn test_resolve_drops_leaf_sibling_segment() {
        // "Vault/Notes" is one document's own path, not a folder every
        // document sits under.
        let docs = vec![doc("Vault/Notes"), doc("Vault/Notes/sub.md")];

        assert_eq!(PathRoot::resolve(&docs).as_str(), "Vault");
    }

    #[test]
    fn test_resolve_empty_list() {
        assert_eq!(PathRoot::resolve(&[]), PathRoot::empty());
    }

    #[test]
    fn test_batch_subset_would_resolve_deeper() {
        // The full set resolves to "Vault"; a batch covering only the A
        // folder would resolve to "Vault/A". Injecting the global root is
        // what keeps batch outputs aligned with an unchunked build.
        let full = vec![doc("Vault/A/x.md"), doc("Vault/A/y.md"), doc("Vault/B/z.md")];
        let batch = &full[..2];

        assert_eq!(PathRoot::resolve(&full).as_str(), "Vault");
        assert_eq!(PathRoot::resolve(batch).as_str(), "Vault/A");
    }

    #[test]
    fn test_strip_removes_prefix_segment() {
        let root = PathRoot::from_recorded("Vault");

        assert_eq!(root.strip("Vault/A/x.md"), "A/x.md");
    }

    #[test]
    fn test_strip_empty_root_keeps_path() {
        let root = PathRoot::empty();

        assert_eq!(root.strip("Korean/A/x.md"), "Korean/A/x.md");
    }

    #[test]
    fn test_strip_path_outside_root_unchanged() {
        let root = PathRoot::from_recorded("Vault/Notes");

        assert_eq!(root.strip("Attachments/img.png"), "Attachments/img.png");
        // A sibling folder sharing the root as a string prefix is outside it.
        assert_eq!(root.strip("Vault/Notes2/x.md"), "Vault/Notes2/x.md");
    }
}
