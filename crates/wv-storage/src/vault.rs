//! Vault trait and error types.
//!
//! Provides the core [`VaultStorage`] trait for abstracting document scanning and
//! retrieval, along with [`VaultError`] for unified error handling across backends.

use std::path::{Path, PathBuf};

/// One source content unit discovered by a vault scan.
///
/// Documents are immutable inputs to the export pipeline. The logical path is
/// stable for the lifetime of a run and doubles as the document's identity in
/// progress ledgers and checkpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Vault-relative logical path (e.g. `notes/topic/page.md`).
    pub path: PathBuf,
    /// Document title (resolved: first H1 > filename).
    pub title: String,
    /// Source size in bytes.
    pub size: u64,
    /// Modification time as seconds since the Unix epoch.
    pub mtime: f64,
}

impl Document {
    /// Logical path as a `/`-separated string.
    #[must_use]
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}

/// Size and mtime for a single vault file.
///
/// Returned by [`VaultStorage::stat`] for attachment files that are not part
/// of the scanned document list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileStat {
    /// Size in bytes.
    pub size: u64,
    /// Modification time as seconds since the Unix epoch.
    pub mtime: f64,
}

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum VaultErrorKind {
    /// Resource does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Malformed or traversal-escaping path.
    InvalidPath,
    /// Backend cannot serve requests right now.
    Unavailable,
    /// Anything that fits no other category.
    Other,
}

/// Vault error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct VaultError {
    /// Semantic error category.
    pub kind: VaultErrorKind,
    /// Logical path involved, when one applies.
    pub path: Option<PathBuf>,
    /// Backend tag such as `"Fs"` or `"Mock"`.
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl VaultError {
    /// Create a new vault error.
    #[must_use]
    pub fn new(kind: VaultErrorKind) -> Self {
        Self {
            kind,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Tag the error with the backend that produced it.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Carry the backend's own error as the source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for a `NotFound` carrying `path`.
    #[must_use]
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::new(VaultErrorKind::NotFound).with_path(path)
    }

    /// Create a vault error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: Option<PathBuf>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => VaultErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => VaultErrorKind::PermissionDenied,
            _ => VaultErrorKind::Other,
        };
        let mut error = Self::new(kind).with_source(err);
        if let Some(p) = path {
            error = error.with_path(p);
        }
        error
    }
}

impl std::fmt::Display for VaultError {
    // Renders as "[Backend] Kind: source message (path: notes/page.md)".
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }
        let kind = match self.kind {
            VaultErrorKind::NotFound => "Not found",
            VaultErrorKind::PermissionDenied => "Permission denied",
            VaultErrorKind::InvalidPath => "Invalid path",
            VaultErrorKind::Unavailable => "Unavailable",
            VaultErrorKind::Other => "Error",
        };
        write!(f, "{kind}")?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for VaultError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Storage abstraction for vault scanning and retrieval.
///
/// Provides a unified interface for accessing vault content regardless of
/// backend. Implementations handle backend-specific details like title
/// extraction and path resolution.
pub trait VaultStorage: Send + Sync {
    /// Scan and return all documents in a stable order.
    ///
    /// The returned order is deterministic for an unchanged vault (directories
    /// before files, alphabetical within each), so batch partitioning on a
    /// resumed run lines up with the original run.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] if scanning fails (e.g. the vault root is missing
    /// or unreadable).
    fn scan(&self) -> Result<Vec<Document>, VaultError>;

    /// Read full document text for rendering.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] if the document doesn't exist or can't be read.
    fn read(&self, path: &Path) -> Result<String, VaultError>;

    /// Read raw bytes, used for attachment payloads.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] if the file doesn't exist or can't be read.
    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, VaultError>;

    /// Check whether a file exists at the given logical path.
    ///
    /// An unreadable path reports as absent.
    fn exists(&self, path: &Path) -> bool;

    /// Size and mtime for a single file.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError`] if the file doesn't exist or can't be inspected.
    fn stat(&self, path: &Path) -> Result<FileStat, VaultError>;
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_document_path_str() {
        let doc = Document {
            path: PathBuf::from("notes/topic/page.md"),
            title: "Page".to_owned(),
            size: 120,
            mtime: 1_700_000_000.0,
        };

        assert_eq!(doc.path_str(), "notes/topic/page.md");
    }

    #[test]
    fn test_vault_error_new() {
        let err = VaultError::new(VaultErrorKind::NotFound);

        assert_eq!(err.kind, VaultErrorKind::NotFound);
        assert!(err.path.is_none());
        assert!(err.backend.is_none());
    }

    #[test]
    fn test_vault_error_with_path() {
        let err = VaultError::new(VaultErrorKind::NotFound).with_path("/foo/bar");

        assert_eq!(err.path.as_deref(), Some(Path::new("/foo/bar")));
    }

    #[test]
    fn test_vault_error_with_backend() {
        let err = VaultError::new(VaultErrorKind::NotFound).with_backend("Fs");

        assert_eq!(err.backend, Some("Fs"));
    }

    #[test]
    fn test_vault_error_not_found() {
        let err = VaultError::not_found("/foo/bar");

        assert_eq!(err.kind, VaultErrorKind::NotFound);
        assert_eq!(err.path.as_deref(), Some(Path::new("/foo/bar")));
    }

    #[test]
    fn test_vault_error_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = VaultError::io(io_err, Some(PathBuf::from("/foo/bar")));

        assert_eq!(err.kind, VaultErrorKind::NotFound);
        assert_eq!(err.path.as_deref(), Some(Path::new("/foo/bar")));
    }

    #[test]
    fn test_vault_error_io_permission_denied() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = VaultError::io(io_err, None);

        assert_eq!(err.kind, VaultErrorKind::PermissionDenied);
    }

    #[test]
    fn test_vault_error_display_simple() {
        let err = VaultError::new(VaultErrorKind::NotFound);

        assert_eq!(err.to_string(), "Not found");
    }

    #[test]
    fn test_vault_error_display_full() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = VaultError::new(VaultErrorKind::NotFound)
            .with_backend("Fs")
            .with_path("/foo/bar")
            .with_source(io_err);

        assert_eq!(err.to_string(), "[Fs] Not found: file not found (path: /foo/bar)");
    }

    #[test]
    fn test_vault_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VaultError>();
    }
}
