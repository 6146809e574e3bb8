//! Final site accumulator and merge rules.
//!
//! One [`FinalSite`] lives for the whole run. Every batch's [`PartialSite`]
//! is folded in through [`FinalSite::merge_partial`]; after the last batch
//! the site is finalized (navigation rebuilt, search sealed, manifest
//! assembled). The accumulator is single-owner by design: only the
//! sequential control loop mutates it, so no locking is involved.
//!
//! # Merge rules
//!
//! - Entries union by output path, first write wins. Later batches cannot
//!   override earlier ones for the same path.
//! - Navigation candidates follow the same dedup rule.
//! - Manifest records merge key-wise (first batch's record wins); the
//!   all-files listing unions instead.
//! - Search postings merge only for paths not already indexed, checked
//!   against the index itself rather than the entry union. A posting whose
//!   first heading duplicates its title has that heading dropped before
//!   indexing.
//! - A partial without a search contribution degrades to an entry-only
//!   merge with a warning; it never fails the batch.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use crate::entry::{EntryKind, NavCandidate, RenderFailure};
use crate::manifest::{ManifestFeatures, SiteManifest, SiteRecord};
use crate::nav::{self, NavNode};
use crate::partial::PartialSite;
use crate::search::SearchIndex;
use crate::sink::{SinkError, SiteSink};

/// Engine version recorded in the manifest.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fatal merge failure.
///
/// Degraded inputs (missing search contribution, malformed postings) are
/// handled with warnings; only an unwritable destination is fatal.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Writing an accepted entry to the destination failed.
    #[error("destination unwritable")]
    Sink(#[from] SinkError),
}

/// Counters describing one merge call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Page entries accepted and written.
    pub pages_added: usize,
    /// Attachment entries accepted and written.
    pub attachments_added: usize,
    /// Entries dropped because their output path was already present.
    pub duplicates_skipped: usize,
    /// Search postings indexed.
    pub search_added: usize,
    /// Search postings skipped (already indexed).
    pub search_skipped: usize,
}

/// The single long-lived accumulator for a run.
pub struct FinalSite {
    root_path: String,
    records: BTreeMap<String, SiteRecord>,
    all_files: Vec<String>,
    nav_candidates: Vec<NavCandidate>,
    nav_seen: HashSet<String>,
    nav: Vec<NavNode>,
    search: SearchIndex,
    failures: Vec<RenderFailure>,
    finalized: bool,
}

impl FinalSite {
    /// Create an empty accumulator.
    ///
    /// `root_path` is the globally resolved shared root (possibly empty),
    /// recorded in the manifest for downstream tooling.
    #[must_use]
    pub fn new(root_path: impl Into<String>) -> Self {
        Self {
            root_path: root_path.into(),
            records: BTreeMap::new(),
            all_files: Vec::new(),
            nav_candidates: Vec::new(),
            nav_seen: HashSet::new(),
            nav: Vec::new(),
            search: SearchIndex::new(),
            failures: Vec::new(),
            finalized: false,
        }
    }

    /// Seed an accumulator from a previous run's artifacts.
    ///
    /// Used on resume: the existing manifest and search index on the
    /// destination become the starting state, so already-exported documents
    /// merge as duplicates instead of being rebuilt. Navigation candidates
    /// are reconstructed from the nav-visible page records; the tree itself
    /// is rebuilt at finalization over the full union.
    #[must_use]
    pub fn from_artifacts(manifest: SiteManifest, search: SearchIndex) -> Self {
        let mut nav_candidates = Vec::new();
        let mut nav_seen = HashSet::new();
        for record in manifest.records.values() {
            if record.kind == EntryKind::Page
                && record.show_in_nav
                && nav_seen.insert(record.output_path.clone())
            {
                nav_candidates.push(NavCandidate {
                    path: record.output_path.clone(),
                    title: record.title.clone(),
                });
            }
        }
        Self {
            root_path: manifest.root_path,
            records: manifest.records,
            all_files: manifest.all_files,
            nav_candidates,
            nav_seen,
            nav: Vec::new(),
            search,
            failures: manifest.failures,
            finalized: false,
        }
    }

    /// Fold one partial site into the accumulator.
    ///
    /// Accepted entry payloads are written through `sink` before their
    /// records are added, so the manifest never describes files that were
    /// not actually written. Duplicate output paths are dropped without
    /// rewriting.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Sink`] when the destination rejects a write.
    /// The partial's already-accepted entries remain merged; callers treat
    /// this as fatal.
    pub fn merge_partial(
        &mut self,
        partial: PartialSite,
        sink: &dyn SiteSink,
    ) -> Result<MergeStats, MergeError> {
        let mut stats = MergeStats::default();
        let batch_index = partial.batch_index;

        for entry in partial.entries {
            if self.records.contains_key(&entry.output_path) {
                stats.duplicates_skipped += 1;
                continue;
            }

            sink.write(&entry.output_path, &entry.bytes)?;

            match entry.kind {
                EntryKind::Page => stats.pages_added += 1,
                EntryKind::Attachment => stats.attachments_added += 1,
            }
            self.all_files.push(entry.output_path.clone());
            self.records
                .insert(entry.output_path.clone(), SiteRecord::from_entry(&entry));
        }

        for candidate in partial.nav_candidates {
            if self.nav_seen.insert(candidate.path.clone()) {
                self.nav_candidates.push(candidate);
            }
        }

        if let Some(contribution) = partial.search {
            for mut posting in contribution.postings {
                if self.search.contains(&posting.output_path) {
                    stats.search_skipped += 1;
                    continue;
                }
                if posting.headings.first() == Some(&posting.title) {
                    posting.headings.remove(0);
                }
                if self.search.insert(&posting) {
                    stats.search_added += 1;
                }
            }
        } else {
            warn!(
                batch = batch_index,
                "partial site has no search contribution; entries merged without indexing"
            );
        }

        self.failures.extend(partial.failures);

        debug!(
            batch = batch_index,
            pages = stats.pages_added,
            attachments = stats.attachments_added,
            duplicates = stats.duplicates_skipped,
            "merged partial site"
        );
        Ok(stats)
    }

    /// Finalize the site: rebuild navigation, seal the search index.
    ///
    /// Idempotent; the first call wins. Navigation order indices are written
    /// back into the per-path records.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        let (nav, orders) = nav::rebuild(&self.nav_candidates);
        for (path, order) in &orders {
            if let Some(record) = self.records.get_mut(path) {
                record.nav_order = Some(*order);
            }
        }
        self.nav = nav;
        self.search.seal();
        self.finalized = true;
    }

    /// Assemble the manifest artifact.
    ///
    /// Meaningful after [`finalize`](Self::finalize); before that, navigation
    /// order indices are absent.
    #[must_use]
    pub fn manifest(&self, generated_at: f64) -> SiteManifest {
        SiteManifest {
            version: VERSION.to_owned(),
            root_path: self.root_path.clone(),
            generated_at,
            page_count: self.page_count(),
            attachment_count: self.attachment_count(),
            features: ManifestFeatures {
                search: !self.search.is_empty(),
                navigation: !self.nav.is_empty(),
            },
            all_files: self.all_files.clone(),
            nav: self.nav.clone(),
            failures: self.failures.clone(),
            records: self.records.clone(),
        }
    }

    /// Shared root path recorded for this site.
    #[must_use]
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Check whether an output path has been merged.
    #[must_use]
    pub fn contains_path(&self, output_path: &str) -> bool {
        self.records.contains_key(output_path)
    }

    /// Look up a merged record.
    #[must_use]
    pub fn record(&self, output_path: &str) -> Option<&SiteRecord> {
        self.records.get(output_path)
    }

    /// All merged output paths, sorted.
    #[must_use]
    pub fn output_paths(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    /// Number of page records.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.kind == EntryKind::Page)
            .count()
    }

    /// Number of attachment records.
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.kind == EntryKind::Attachment)
            .count()
    }

    /// Total merged entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has merged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The search index.
    #[must_use]
    pub fn search(&self) -> &SearchIndex {
        &self.search
    }

    /// The rebuilt navigation tree (empty before finalization).
    #[must_use]
    pub fn nav(&self) -> &[NavNode] {
        &self.nav
    }

    /// Render failures accumulated across batches.
    #[must_use]
    pub fn failures(&self) -> &[RenderFailure] {
        &self.failures
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use static_assertions::assert_impl_all;

    use crate::entry::OutputEntry;
    use crate::partial::{SearchContribution, SearchPosting};
    use crate::sink::MemorySink;

    use super::*;

    assert_impl_all!(FinalSite: Send, Sync);

    fn page_entry(output_path: &str, body: &str) -> OutputEntry {
        OutputEntry {
            output_path: output_path.to_owned(),
            kind: EntryKind::Page,
            source_path: PathBuf::from(format!("src/{output_path}")),
            title: format!("Title {output_path}"),
            show_in_nav: true,
            source_size: body.len() as u64,
            created: 1.0,
            modified: 2.0,
            bytes: body.as_bytes().to_vec(),
        }
    }

    fn attachment_entry(output_path: &str) -> OutputEntry {
        OutputEntry {
            output_path: output_path.to_owned(),
            kind: EntryKind::Attachment,
            source_path: PathBuf::from(format!("src/{output_path}")),
            title: output_path.to_owned(),
            show_in_nav: false,
            source_size: 1,
            created: 1.0,
            modified: 2.0,
            bytes: vec![0],
        }
    }

    fn posting_for(path: &str, title: &str, headings: &[&str]) -> SearchPosting {
        SearchPosting {
            output_path: path.to_owned(),
            title: title.to_owned(),
            aliases: Vec::new(),
            headings: headings.iter().map(|h| (*h).to_owned()).collect(),
            tags: Vec::new(),
            path: path.to_owned(),
            content: "body".to_owned(),
        }
    }

    fn partial_with(entries: Vec<OutputEntry>, postings: Vec<SearchPosting>) -> PartialSite {
        let nav_candidates = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Page && e.show_in_nav)
            .map(|e| NavCandidate {
                path: e.output_path.clone(),
                title: e.title.clone(),
            })
            .collect();
        PartialSite {
            batch_index: 0,
            document_count: entries.len(),
            entries,
            nav_candidates,
            search: Some(SearchContribution { postings }),
            rendered_at: 0.0,
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_merge_writes_payloads_through_sink() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        let partial = partial_with(vec![page_entry("a.html", "<p>a</p>")], Vec::new());

        let stats = site.merge_partial(partial, &sink).unwrap();

        assert_eq!(stats.pages_added, 1);
        assert_eq!(sink.get("a.html").unwrap(), b"<p>a</p>");
        assert!(site.contains_path("a.html"));
    }

    #[test]
    fn test_merge_first_write_wins() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        let first = partial_with(vec![page_entry("a.html", "first")], Vec::new());
        let mut second = partial_with(vec![page_entry("a.html", "second")], Vec::new());
        second.entries[0].title = "Other Title".to_owned();

        site.merge_partial(first, &sink).unwrap();
        let stats = site.merge_partial(second, &sink).unwrap();

        assert_eq!(stats.pages_added, 0);
        assert_eq!(stats.duplicates_skipped, 1);
        assert_eq!(sink.get("a.html").unwrap(), b"first");
        assert_eq!(site.record("a.html").unwrap().title, "Title a.html");
    }

    #[test]
    fn test_merge_idempotent() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        let partial = partial_with(
            vec![page_entry("a.html", "a"), attachment_entry("img.png")],
            vec![posting_for("a.html", "A", &[])],
        );

        site.merge_partial(partial.clone(), &sink).unwrap();
        let before_paths = site.output_paths();
        let before_search = site.search().len();

        site.merge_partial(partial, &sink).unwrap();

        assert_eq!(site.output_paths(), before_paths);
        assert_eq!(site.search().len(), before_search);
        assert_eq!(site.all_files.len(), 2);
    }

    #[test]
    fn test_merge_order_independent_path_set() {
        let batch_a = || partial_with(vec![page_entry("a.html", "a")], Vec::new());
        let batch_b = || partial_with(vec![page_entry("b.html", "b")], Vec::new());

        let mut ab = FinalSite::new("");
        let sink_ab = MemorySink::new();
        ab.merge_partial(batch_a(), &sink_ab).unwrap();
        ab.merge_partial(batch_b(), &sink_ab).unwrap();

        let mut ba = FinalSite::new("");
        let sink_ba = MemorySink::new();
        ba.merge_partial(batch_b(), &sink_ba).unwrap();
        ba.merge_partial(batch_a(), &sink_ba).unwrap();

        assert_eq!(ab.output_paths(), ba.output_paths());
        assert_eq!(sink_ab.paths(), sink_ba.paths());
    }

    #[test]
    fn test_merge_all_files_unioned_in_write_order() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();

        site.merge_partial(
            partial_with(vec![page_entry("z.html", "z")], Vec::new()),
            &sink,
        )
        .unwrap();
        site.merge_partial(
            partial_with(
                vec![page_entry("a.html", "a"), page_entry("z.html", "dup")],
                Vec::new(),
            ),
            &sink,
        )
        .unwrap();

        assert_eq!(site.all_files, vec!["z.html", "a.html"]);
    }

    #[test]
    fn test_merge_search_gated_by_index_membership() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        let first = partial_with(Vec::new(), vec![posting_for("a.html", "First", &[])]);
        let second = partial_with(Vec::new(), vec![posting_for("a.html", "Second", &[])]);

        site.merge_partial(first, &sink).unwrap();
        let stats = site.merge_partial(second, &sink).unwrap();

        assert_eq!(stats.search_added, 0);
        assert_eq!(stats.search_skipped, 1);
        assert_eq!(site.search().get("a.html").unwrap().title, "First");
    }

    #[test]
    fn test_merge_drops_first_heading_duplicating_title() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        let partial = partial_with(
            Vec::new(),
            vec![posting_for("a.html", "Intro", &["Intro", "Details"])],
        );

        site.merge_partial(partial, &sink).unwrap();

        let doc = site.search().get("a.html").unwrap();
        assert_eq!(doc.postings.headings, vec!["details"]);
    }

    #[test]
    fn test_merge_keeps_first_heading_when_distinct() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        let partial = partial_with(
            Vec::new(),
            vec![posting_for("a.html", "Intro", &["Overview", "Details"])],
        );

        site.merge_partial(partial, &sink).unwrap();

        let doc = site.search().get("a.html").unwrap();
        assert_eq!(doc.postings.headings, vec!["details", "overview"]);
    }

    #[test]
    fn test_merge_missing_search_contribution_still_merges_entries() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        let mut partial = partial_with(vec![page_entry("a.html", "a")], Vec::new());
        partial.search = None;

        let stats = site.merge_partial(partial, &sink).unwrap();

        assert_eq!(stats.pages_added, 1);
        assert!(site.contains_path("a.html"));
        assert!(site.search().is_empty());
    }

    #[test]
    fn test_merge_nav_candidates_dedup() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        let partial = partial_with(vec![page_entry("a.html", "a")], Vec::new());

        site.merge_partial(partial.clone(), &sink).unwrap();
        site.merge_partial(partial, &sink).unwrap();

        assert_eq!(site.nav_candidates.len(), 1);
    }

    #[test]
    fn test_merge_accumulates_failures() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        let mut partial = partial_with(Vec::new(), Vec::new());
        partial.failures.push(RenderFailure {
            source_path: "bad.md".to_owned(),
            reason: "boom".to_owned(),
        });

        site.merge_partial(partial, &sink).unwrap();

        assert_eq!(site.failures().len(), 1);
    }

    #[test]
    fn test_finalize_rebuilds_nav_and_assigns_orders() {
        let mut site = FinalSite::new("Vault");
        let sink = MemorySink::new();
        site.merge_partial(
            partial_with(
                vec![
                    page_entry("guides/a.html", "a"),
                    page_entry("top.html", "t"),
                ],
                Vec::new(),
            ),
            &sink,
        )
        .unwrap();

        site.finalize();

        assert_eq!(site.nav().len(), 2);
        assert!(site.nav()[0].is_folder);
        assert_eq!(site.record("guides/a.html").unwrap().nav_order, Some(1));
        assert_eq!(site.record("top.html").unwrap().nav_order, Some(2));
        assert!(site.search().is_sealed());
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut site = FinalSite::new("");
        let sink = MemorySink::new();
        site.merge_partial(
            partial_with(vec![page_entry("a.html", "a")], Vec::new()),
            &sink,
        )
        .unwrap();

        site.finalize();
        let nav_after_first = site.nav().to_vec();
        site.finalize();

        assert_eq!(site.nav(), nav_after_first.as_slice());
    }

    #[test]
    fn test_from_artifacts_resumes_with_prior_state() {
        let mut first = FinalSite::new("Vault");
        let sink = MemorySink::new();
        first
            .merge_partial(
                partial_with(
                    vec![page_entry("a.html", "a"), attachment_entry("img.png")],
                    vec![posting_for("a.html", "A", &[])],
                ),
                &sink,
            )
            .unwrap();
        first.finalize();
        let manifest = first.manifest(100.0);
        let search =
            SearchIndex::from_artifact_json(&first.search().to_artifact_json().unwrap()).unwrap();

        let mut resumed = FinalSite::from_artifacts(manifest, search);
        let resume_sink = MemorySink::new();
        resumed
            .merge_partial(
                partial_with(
                    vec![page_entry("a.html", "changed"), page_entry("b.html", "b")],
                    vec![posting_for("b.html", "B", &[])],
                ),
                &resume_sink,
            )
            .unwrap();
        resumed.finalize();

        assert_eq!(resumed.root_path(), "Vault");
        assert_eq!(resumed.output_paths(), vec!["a.html", "b.html", "img.png"]);
        // Prior entries are duplicates; only the new page reaches the sink.
        assert_eq!(resume_sink.paths(), vec!["b.html"]);
        assert_eq!(resumed.search().len(), 2);
        assert_eq!(resumed.record("a.html").unwrap().nav_order, Some(0));
    }

    #[test]
    fn test_manifest_reflects_merged_state() {
        let mut site = FinalSite::new("Vault");
        let sink = MemorySink::new();
        site.merge_partial(
            partial_with(
                vec![page_entry("a.html", "a"), attachment_entry("img.png")],
                vec![posting_for("a.html", "A", &[])],
            ),
            &sink,
        )
        .unwrap();
        site.finalize();

        let manifest = site.manifest(123.0);

        assert_eq!(manifest.root_path, "Vault");
        assert_eq!(manifest.page_count, 1);
        assert_eq!(manifest.attachment_count, 1);
        assert!(manifest.features.search);
        assert!(manifest.features.navigation);
        assert_eq!(manifest.records.len(), 2);
    }
}
