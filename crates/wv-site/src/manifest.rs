//! Site manifest artifact.
//!
//! The durable contract other tooling reads to rebuild or validate the site:
//! one descriptive record per output path plus global fields. Serialized as
//! `site-manifest.json` at the destination root.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entry::{EntryKind, OutputEntry, RenderFailure};
use crate::nav::NavNode;

/// Per-output-path descriptive record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Site-relative output path.
    #[serde(rename = "outputPath")]
    pub output_path: String,
    /// Vault-relative source path.
    #[serde(rename = "sourcePath")]
    pub source_path: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Display title.
    pub title: String,
    /// Source creation time as seconds since the Unix epoch.
    pub created: f64,
    /// Source modification time as seconds since the Unix epoch.
    pub modified: f64,
    /// Source size in bytes.
    #[serde(rename = "sourceSize")]
    pub source_size: u64,
    /// Whether the entry participates in navigation.
    #[serde(rename = "showInNav")]
    pub show_in_nav: bool,
    /// Depth-first navigation order, assigned by the tree rebuild.
    #[serde(rename = "navOrder", skip_serializing_if = "Option::is_none")]
    pub nav_order: Option<usize>,
}

impl SiteRecord {
    /// Build a record from an output entry (payload not included).
    #[must_use]
    pub fn from_entry(entry: &OutputEntry) -> Self {
        Self {
            output_path: entry.output_path.clone(),
            source_path: entry.source_path.to_string_lossy().replace('\\', "/"),
            kind: entry.kind,
            title: entry.title.clone(),
            created: entry.created,
            modified: entry.modified,
            source_size: entry.source_size,
            show_in_nav: entry.show_in_nav,
            nav_order: None,
        }
    }
}

/// Feature flags recorded in the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFeatures {
    /// Search index artifact was produced.
    pub search: bool,
    /// Navigation tree was produced.
    pub navigation: bool,
}

/// The site manifest artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteManifest {
    /// Engine version that produced the site.
    pub version: String,
    /// Shared root path stripped from every output path (empty when none).
    #[serde(rename = "rootPath")]
    pub root_path: String,
    /// Generation time as seconds since the Unix epoch.
    #[serde(rename = "generatedAt")]
    pub generated_at: f64,
    /// Number of page records.
    #[serde(rename = "pageCount")]
    pub page_count: usize,
    /// Number of attachment records.
    #[serde(rename = "attachmentCount")]
    pub attachment_count: usize,
    /// Feature flags.
    pub features: ManifestFeatures,
    /// Every output path, in first-written order.
    #[serde(rename = "allFiles")]
    pub all_files: Vec<String>,
    /// Navigation tree (folders before files, depth-first order).
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub nav: Vec<NavNode>,
    /// Documents that failed to render and were skipped.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<RenderFailure>,
    /// Per-output-path records.
    pub records: BTreeMap<String, SiteRecord>,
}

impl SiteManifest {
    /// Serialize to the artifact JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_record_from_entry_drops_payload() {
        let entry = OutputEntry {
            output_path: "a/x.html".to_owned(),
            kind: EntryKind::Page,
            source_path: PathBuf::from("Vault/A/x.md"),
            title: "X".to_owned(),
            show_in_nav: true,
            source_size: 42,
            created: 1.0,
            modified: 2.0,
            bytes: vec![1, 2, 3],
        };

        let record = SiteRecord::from_entry(&entry);

        assert_eq!(record.output_path, "a/x.html");
        assert_eq!(record.source_path, "Vault/A/x.md");
        assert_eq!(record.source_size, 42);
        assert_eq!(record.nav_order, None);
    }

    #[test]
    fn test_manifest_json_field_names() {
        let manifest = SiteManifest {
            version: "0.2.1".to_owned(),
            root_path: "Vault".to_owned(),
            generated_at: 3.0,
            page_count: 0,
            attachment_count: 0,
            features: ManifestFeatures {
                search: true,
                navigation: true,
            },
            all_files: vec!["a.html".to_owned()],
            nav: Vec::new(),
            failures: Vec::new(),
            records: BTreeMap::new(),
        };

        let json = manifest.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["rootPath"], "Vault");
        assert_eq!(value["allFiles"][0], "a.html");
        assert_eq!(value["features"]["search"], true);
    }
}
