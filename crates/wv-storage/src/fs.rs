//! Filesystem vault implementation.
//!
//! Provides [`FsVault`] for reading documents and attachments from a local
//! vault directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use glob::Pattern;
use regex::Regex;
use tracing::debug;

use crate::vault::{Document, FileStat, VaultError, VaultErrorKind, VaultStorage};

/// Backend tag carried in [`VaultError`]s.
const BACKEND: &str = "Fs";

/// Filesystem vault implementation.
///
/// Scans a vault directory recursively for markdown files and extracts titles
/// from the first H1 heading. Scan order is deterministic: directories before
/// files, alphabetical within each level.
///
/// # Example
///
/// ```ignore
/// use std::path::PathBuf;
/// use wv_storage::{FsVault, VaultStorage};
///
/// let vault = FsVault::new(PathBuf::from("vault"));
/// let docs = vault.scan()?;
/// ```
pub struct FsVault {
    /// Root directory of the vault.
    root: PathBuf,
    /// Regex for extracting the first H1 heading.
    h1_regex: Regex,
    /// Glob patterns excluded from scanning (e.g. "drafts/**").
    ignore_patterns: Vec<Pattern>,
}

impl FsVault {
    /// Create a new filesystem vault with no ignore patterns.
    ///
    /// # Panics
    ///
    /// Panics if the H1 extraction regex fails to compile, which cannot happen
    /// for the constant pattern used here.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self::with_ignore_patterns(root, &[])
    }

    /// Create a new filesystem vault with ignore patterns.
    ///
    /// Paths matching any pattern (relative to the vault root) are excluded
    /// from the scan. Invalid patterns are skipped with a debug log.
    ///
    /// # Panics
    ///
    /// Panics if the H1 extraction regex fails to compile.
    #[must_use]
    pub fn with_ignore_patterns(root: PathBuf, patterns: &[String]) -> Self {
        let ignore_patterns = patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(err) => {
                    debug!(pattern = %p, error = %err, "skipping invalid ignore pattern");
                    None
                }
            })
            .collect();

        Self {
            root,
            h1_regex: Regex::new(r"(?m)^#\s+(.+)$").unwrap(),
            ignore_patterns,
        }
    }

    /// Validate that a path stays inside the vault root.
    ///
    /// Any `..` component is rejected outright, so a logical path can never
    /// climb out of the vault.
    fn validate_path(path: &Path) -> Result<(), VaultError> {
        let has_parent_dir = path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));

        if has_parent_dir {
            return Err(VaultError::new(VaultErrorKind::InvalidPath)
                .with_path(path)
                .with_backend(BACKEND));
        }
        Ok(())
    }

    fn is_ignored(&self, rel_path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(rel_path))
    }

    /// Scan a directory recursively and collect documents.
    fn scan_directory(&self, dir_path: &Path, base_path: &Path, documents: &mut Vec<Document>) {
        let Ok(entries) = fs::read_dir(dir_path) else {
            debug!(path = %dir_path.display(), "skipping unreadable directory");
            return;
        };

        // file_type is cached up front; the sort comparator must not stat
        let mut entries: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|e| {
                let is_dir = e.file_type().is_ok_and(|t| t.is_dir());
                let name_lower = e.file_name().to_string_lossy().to_lowercase();
                (e, is_dir, name_lower)
            })
            .collect();

        // Directories first, then case-insensitive by name
        entries.sort_by(|(_, a_is_dir, a_name), (_, b_is_dir, b_name)| {
            b_is_dir.cmp(a_is_dir).then_with(|| a_name.cmp(b_name))
        });

        for (entry, is_dir, name_lower) in entries {
            // Dotfiles and underscore-prefixed names are private to the vault
            if name_lower.starts_with('.') || name_lower.starts_with('_') {
                continue;
            }

            // Skip common non-content directories
            if is_dir
                && matches!(
                    name_lower.as_str(),
                    "node_modules" | "target" | "dist" | "build" | ".trash" | "vendor"
                )
            {
                continue;
            }

            let rel_path = base_path.join(entry.file_name());
            if self.is_ignored(&rel_path) {
                continue;
            }

            let path = entry.path();
            if is_dir {
                self.scan_directory(&path, &rel_path, documents);
            } else if path.extension().is_some_and(|e| e == "md") {
                let Ok(meta) = entry.metadata() else {
                    debug!(path = %path.display(), "skipping unreadable file");
                    continue;
                };
                let title = self
                    .extract_title_from_content(&path)
                    .unwrap_or_else(|| Self::title_from_filename(&name_lower));
                documents.push(Document {
                    path: rel_path,
                    title,
                    size: meta.len(),
                    mtime: mtime_seconds(&meta),
                });
            }
        }
    }

    /// Extract title from the first H1 heading in a markdown file.
    fn extract_title_from_content(&self, file_path: &Path) -> Option<String> {
        let content = fs::read_to_string(file_path).ok()?;
        self.h1_regex
            .captures(&content)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_owned())
    }

    /// Title Case fallback for documents without an H1.
    fn title_from_filename(name_lower: &str) -> String {
        let name = name_lower.strip_suffix(".md").unwrap_or(name_lower);

        name.replace(['-', '_'], " ")
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Modification time as fractional seconds since the Unix epoch.
fn mtime_seconds(meta: &fs::Metadata) -> f64 {
    meta.modified()
        .ok()
        .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
        .map_or(0.0, |d| d.as_secs_f64())
}

impl VaultStorage for FsVault {
    fn scan(&self) -> Result<Vec<Document>, VaultError> {
        if !self.root.exists() {
            return Err(VaultError::not_found(self.root.clone()).with_backend(BACKEND));
        }

        let mut documents = Vec::new();
        self.scan_directory(&self.root, Path::new(""), &mut documents);
        debug!(count = documents.len(), "vault scan complete");
        Ok(documents)
    }

    fn read(&self, path: &Path) -> Result<String, VaultError> {
        Self::validate_path(path)?;
        let full_path = self.root.join(path);
        fs::read_to_string(&full_path)
            .map_err(|e| VaultError::io(e, Some(full_path.clone())).with_backend(BACKEND))
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, VaultError> {
        Self::validate_path(path)?;
        let full_path = self.root.join(path);
        fs::read(&full_path)
            .map_err(|e| VaultError::io(e, Some(full_path.clone())).with_backend(BACKEND))
    }

    fn exists(&self, path: &Path) -> bool {
        Self::validate_path(path).is_ok() && self.root.join(path).exists()
    }

    fn stat(&self, path: &Path) -> Result<FileStat, VaultError> {
        Self::validate_path(path)?;
        let full_path = self.root.join(path);
        let meta = fs::metadata(&full_path)
            .map_err(|e| VaultError::io(e, Some(full_path.clone())).with_backend(BACKEND))?;
        Ok(FileStat {
            size: meta.len(),
            mtime: mtime_seconds(&meta),
        })
    }
}
