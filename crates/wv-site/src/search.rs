//! Full-text search index.
//!
//! One sealed index keyed by output path, with per-field term postings
//! suitable for offline lookup. The index accumulates across batch merges
//! and is sealed exactly once at finalization; the serialized form is the
//! `search-index.json` artifact.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::partial::SearchPosting;

/// Tokenized terms for each searchable field of one document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPostings {
    /// Terms from the document title.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub title: Vec<String>,
    /// Terms from frontmatter aliases.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub aliases: Vec<String>,
    /// Terms from headings.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub headings: Vec<String>,
    /// Terms from frontmatter tags.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    /// Terms from the output path.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub path: Vec<String>,
    /// Terms from the body text.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub content: Vec<String>,
}

/// One indexed document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    /// Raw title for result display.
    pub title: String,
    /// Per-field term postings.
    pub postings: FieldPostings,
}

/// Search index keyed by output path.
///
/// Grows via [`insert`](Self::insert) during merging and is sealed once at
/// finalization. Membership checks gate merging: a document already indexed
/// is never re-indexed, independent of the output entry union.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchIndex {
    documents: BTreeMap<String, SearchDocument>,
    sealed: bool,
}

/// Serialized form of the index artifact.
#[derive(Serialize, Deserialize)]
struct SearchArtifact {
    version: u32,
    documents: BTreeMap<String, SearchDocument>,
}

/// Artifact format version.
const ARTIFACT_VERSION: u32 = 1;

impl SearchIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether an output path is already indexed.
    #[must_use]
    pub fn contains(&self, output_path: &str) -> bool {
        self.documents.contains_key(output_path)
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when no documents are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// True once the index has been sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Index one document from its raw posting fields.
    ///
    /// Returns `false` without touching the index when the path is already
    /// present or the index is sealed (the latter is a caller bug and logs a
    /// warning).
    pub fn insert(&mut self, posting: &SearchPosting) -> bool {
        if self.sealed {
            warn!(path = %posting.output_path, "ignoring insert into sealed search index");
            return false;
        }
        if self.documents.contains_key(&posting.output_path) {
            return false;
        }

        let postings = FieldPostings {
            title: tokenize(&posting.title),
            aliases: tokenize_all(&posting.aliases),
            headings: tokenize_all(&posting.headings),
            tags: tokenize_all(&posting.tags),
            path: tokenize(&posting.path),
            content: tokenize(&posting.content),
        };
        self.documents.insert(
            posting.output_path.clone(),
            SearchDocument {
                title: posting.title.clone(),
                postings,
            },
        );
        true
    }

    /// Look up an indexed document.
    #[must_use]
    pub fn get(&self, output_path: &str) -> Option<&SearchDocument> {
        self.documents.get(output_path)
    }

    /// Seal the index. Further inserts are rejected.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Serialize the sealed index to the artifact JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error from `serde_json`.
    pub fn to_artifact_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&SearchArtifact {
            version: ARTIFACT_VERSION,
            documents: self.documents.clone(),
        })
    }

    /// Rebuild an unsealed index from a previously written artifact.
    ///
    /// Used when a run resumes on top of an existing destination: the prior
    /// run's index becomes the starting membership set, so already-exported
    /// documents are not re-indexed.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error when the artifact is malformed or its
    /// version is unknown.
    pub fn from_artifact_json(json: &str) -> Result<Self, serde_json::Error> {
        let artifact: SearchArtifact = serde_json::from_str(json)?;
        if artifact.version != ARTIFACT_VERSION {
            warn!(
                version = artifact.version,
                "search artifact has a newer version; indexing from scratch"
            );
            return Ok(Self::new());
        }
        Ok(Self {
            documents: artifact.documents,
            sealed: false,
        })
    }
}

/// Lowercase alphanumeric tokens of a text, sorted and deduplicated.
///
/// Splits on any non-alphanumeric character, which keeps non-Latin scripts
/// intact as whole-run tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let terms: BTreeSet<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect();
    terms.into_iter().collect()
}

fn tokenize_all(texts: &[String]) -> Vec<String> {
    let terms: BTreeSet<String> = texts.iter().flat_map(|t| tokenize(t)).collect();
    terms.into_iter().collect()
}
