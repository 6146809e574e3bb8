//! Mock vault implementation for testing.
//!
//! Provides [`MockVault`] for unit testing without filesystem access.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::vault::{Document, FileStat, VaultError, VaultStorage};

/// Backend tag carried in [`VaultError`]s.
const BACKEND: &str = "Mock";

/// Mtime assigned to mock files unless overridden.
const DEFAULT_MTIME: f64 = 1_700_000_000.0;

/// Mock vault for testing.
///
/// Stores documents and file bytes in memory. Use the builder methods to
/// configure the mock with test data.
///
/// # Example
///
/// ```ignore
/// use std::path::Path;
/// use wv_storage::{MockVault, VaultStorage};
///
/// let vault = MockVault::new()
///     .with_document("guide.md", "# User Guide\n\nContent.")
///     .with_attachment("img/logo.png", b"png-bytes".to_vec());
///
/// let docs = vault.scan().unwrap();
/// let content = vault.read(Path::new("guide.md")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MockVault {
    documents: Vec<Document>,
    contents: HashMap<PathBuf, String>,
    bytes: HashMap<PathBuf, Vec<u8>>,
}

impl MockVault {
    /// Create a new empty mock vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document with the given path and content.
    ///
    /// Title is taken from the first H1 heading, falling back to the file name.
    #[must_use]
    pub fn with_document(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path: PathBuf = path.into();
        let content: String = content.into();
        let title = content
            .lines()
            .find_map(|line| line.strip_prefix("# "))
            .map_or_else(
                || {
                    path.file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default()
                },
                |h| h.trim().to_owned(),
            );
        self.documents.push(Document {
            path: path.clone(),
            title,
            size: content.len() as u64,
            mtime: DEFAULT_MTIME,
        });
        self.contents.insert(path, content);
        self
    }

    /// Add an attachment file with raw bytes.
    #[must_use]
    pub fn with_attachment(mut self, path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        self.bytes.insert(path.into(), bytes);
        self
    }

    /// Override the mtime of a previously added document.
    #[must_use]
    pub fn with_mtime(mut self, path: impl Into<PathBuf>, mtime: f64) -> Self {
        let path: PathBuf = path.into();
        if let Some(doc) = self.documents.iter_mut().find(|d| d.path == path) {
            doc.mtime = mtime;
        }
        self
    }
}

impl VaultStorage for MockVault {
    fn scan(&self) -> Result<Vec<Document>, VaultError> {
        Ok(self.documents.clone())
    }

    fn read(&self, path: &Path) -> Result<String, VaultError> {
        self.contents
            .get(path)
            .cloned()
            .ok_or_else(|| VaultError::not_found(path).with_backend(BACKEND))
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, VaultError> {
        if let Some(bytes) = self.bytes.get(path) {
            return Ok(bytes.clone());
        }
        self.contents
            .get(path)
            .map(|c| c.as_bytes().to_vec())
            .ok_or_else(|| VaultError::not_found(path).with_backend(BACKEND))
    }

    fn exists(&self, path: &Path) -> bool {
        self.contents.contains_key(path) || self.bytes.contains_key(path)
    }

    fn stat(&self, path: &Path) -> Result<FileStat, VaultError> {
        if let Some(doc) = self.documents.iter().find(|d| d.path == path) {
            return Ok(FileStat {
                size: doc.size,
                mtime: doc.mtime,
            });
        }
        self.bytes
            .get(path)
            .map(|b| FileStat {
                size: b.len() as u64,
                mtime: DEFAULT_MTIME,
            })
            .ok_or_else(|| VaultError::not_found(path).with_backend(BACKEND))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_mock_scan_returns_documents_in_insertion_order() {
        let vault = MockVault::new()
            .with_document("b.md", "# B")
            .with_document("a.md", "# A");

        let docs = vault.scan().unwrap();

        let paths: Vec<_> = docs.iter().map(Document::path_str).collect();
        assert_eq!(paths, vec!["b.md", "a.md"]);
    }

    #[test]
    fn test_mock_title_from_heading() {
        let vault = MockVault::new().with_document("page.md", "intro\n# Actual Title\nbody");

        let docs = vault.scan().unwrap();

        assert_eq!(docs[0].title, "Actual Title");
    }

    #[test]
    fn test_mock_title_falls_back_to_stem() {
        let vault = MockVault::new().with_document("plain.md", "no heading");

        let docs = vault.scan().unwrap();

        assert_eq!(docs[0].title, "plain");
    }

    #[test]
    fn test_mock_read_missing_is_not_found() {
        let vault = MockVault::new();

        assert!(vault.read(Path::new("missing.md")).is_err());
    }

    #[test]
    fn test_mock_read_bytes_prefers_attachments() {
        let vault = MockVault::new()
            .with_document("page.md", "text")
            .with_attachment("img.png", vec![1, 2, 3]);

        assert_eq!(vault.read_bytes(Path::new("img.png")).unwrap(), vec![1, 2, 3]);
        assert_eq!(vault.read_bytes(Path::new("page.md")).unwrap(), b"text".to_vec());
    }

    #[test]
    fn test_mock_exists_covers_documents_and_attachments() {
        let vault = MockVault::new()
            .with_document("page.md", "text")
            .with_attachment("img.png", vec![1]);

        assert!(vault.exists(Path::new("page.md")));
        assert!(vault.exists(Path::new("img.png")));
        assert!(!vault.exists(Path::new("other.md")));
    }

    #[test]
    fn test_mock_stat_uses_document_metadata() {
        let vault = MockVault::new()
            .with_document("page.md", "12345")
            .with_mtime("page.md", 42.0);

        let stat = vault.stat(Path::new("page.md")).unwrap();

        assert_eq!(stat.size, 5);
        assert_eq!(stat.mtime, 42.0);
    }
}
