//! Chunked export orchestration.
//!
//! The exporter owns the sequential control loop: resolve the shared root
//! once, partition the document list, then for each batch build a partial
//! site, fold it into the accumulator, snapshot the site artifacts, and
//! record progress. The loop is strictly sequential across batches; peak
//! memory is capped per batch, not amortized by overlap.
//!
//! Progress and checkpoint files live beside the site at the destination
//! root, so the sink passed to [`Exporter::run`] must write under
//! [`ExportOptions::destination`] for a later run to find prior artifacts.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, warn};
use wv_render::{DocumentRenderer, MarkdownRenderer};
use wv_site::{
    FinalSite, MergeError, PartialSite, RenderFailure, SearchIndex, SinkError, SiteManifest,
    SiteSink,
};
use wv_storage::{Document, VaultError, VaultStorage};

use crate::builder::{BuildError, ChunkBuilder};
use crate::checkpoint::{CheckpointError, ResumeCheckpoint};
use crate::chunk::{self, Batch, DEFAULT_CHUNK_THRESHOLD, MIN_BATCH_SIZE};
use crate::governor::{MemoryGovernor, MemorySample, Watermarks};
use crate::ledger::{self, LedgerError, ProgressLedger, ProgressRecord};
use crate::reporter::{ExportEvent, ProgressReporter};
use crate::roots::PathRoot;

/// File name of the site manifest artifact at the destination root.
pub const MANIFEST_FILE: &str = "site-manifest.json";

/// File name of the search index artifact at the destination root.
pub const SEARCH_INDEX_FILE: &str = "search-index.json";

/// Per-run settings, fixed before the first batch.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    /// Destination root the site is written under.
    pub destination: PathBuf,
    /// Fixed batch size, overriding the adaptive policy.
    pub batch_size: Option<usize>,
    /// Document count at or below which the run is a single batch.
    pub chunk_threshold: usize,
    /// Ignore prior progress and start from batch 0.
    pub force: bool,
    /// Persist progress and checkpoint files at the destination.
    ///
    /// Dry runs disable this so nothing outlives the process.
    pub track_progress: bool,
    /// Memory thresholds driving cleanup and abort decisions.
    pub watermarks: Watermarks,
    /// Age beyond which a prior progress record is ignored.
    pub ledger_max_age: Duration,
}

impl ExportOptions {
    /// Defaults for a destination: adaptive batch size, chunked above
    /// [`DEFAULT_CHUNK_THRESHOLD`] documents, progress tracked.
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            batch_size: None,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            force: false,
            track_progress: true,
            watermarks: Watermarks::default(),
            ledger_max_age: ledger::DEFAULT_MAX_AGE,
        }
    }
}

/// Export failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// The vault could not be scanned.
    #[error("vault scan failed")]
    Scan(#[source] VaultError),
    /// The vault contains no markdown documents.
    #[error("vault contains no markdown documents")]
    EmptyVault,
    /// The checkpoint's remaining documents no longer exist in the vault.
    #[error("checkpoint lists no documents still present in the vault")]
    NothingToResume,
    /// The destination rejected a write.
    #[error("destination unwritable")]
    Destination(#[from] SinkError),
    /// Progress could not be recorded.
    #[error("could not record progress")]
    Ledger(#[from] LedgerError),
    /// The resume checkpoint could not be written.
    #[error("could not write resume checkpoint")]
    Checkpoint(#[from] CheckpointError),
    /// A site artifact could not be encoded.
    #[error("could not encode site artifact")]
    Artifact(#[source] serde_json::Error),
}

impl From<MergeError> for ExportError {
    fn from(e: MergeError) -> Self {
        match e {
            MergeError::Sink(e) => Self::Destination(e),
        }
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Every batch merged and the site was finalized.
    Completed,
    /// Cancellation was requested; progress is saved for a later run.
    Cancelled,
    /// The memory governor stopped the run; a resume checkpoint was
    /// written and the partial site finalized.
    MemoryAborted,
}

/// What a run produced.
#[derive(Clone, Debug)]
pub struct ExportSummary {
    /// How the run ended.
    pub outcome: ExportOutcome,
    /// Shared root stripped from output paths (empty when none).
    pub root_path: String,
    /// Documents in scope for the whole site, prior runs included.
    pub documents: usize,
    /// Pages in the accumulated site.
    pub pages: usize,
    /// Attachments in the accumulated site.
    pub attachments: usize,
    /// Documents that failed to render and were skipped.
    pub failures: Vec<RenderFailure>,
    /// Batches fully merged, prior progress included.
    pub completed_batches: usize,
    /// Batches in this run's plan.
    pub total_batches: usize,
    /// Wall-clock duration of this run.
    pub elapsed: Duration,
}

impl ExportSummary {
    /// Share of this run's planned batches that completed, 0-100.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn completion_percent(&self) -> f64 {
        if self.total_batches == 0 {
            return 100.0;
        }
        self.completed_batches as f64 / self.total_batches as f64 * 100.0
    }
}

/// Everything the batch loop carries between batches.
struct RunState {
    documents: Vec<Document>,
    batches: Vec<Batch>,
    site: FinalSite,
    builder: ChunkBuilder,
    governor: MemoryGovernor,
    ledger: ProgressLedger,
    record: ProgressRecord,
    skip: HashSet<usize>,
    prior_processed: Vec<String>,
    total_documents: usize,
    started: Instant,
}

/// Chunked vault exporter.
///
/// One exporter serves one run configuration; [`run`](Self::run) and
/// [`resume`](Self::resume) may be called repeatedly against the same
/// destination, never concurrently.
pub struct Exporter {
    vault: Arc<dyn VaultStorage>,
    renderer: Arc<dyn DocumentRenderer>,
    options: ExportOptions,
}

impl Exporter {
    /// Create an exporter rendering markdown from the given vault.
    #[must_use]
    pub fn new(vault: Arc<dyn VaultStorage>, options: ExportOptions) -> Self {
        let renderer = Arc::new(MarkdownRenderer::new(Arc::clone(&vault)));
        Self {
            vault,
            renderer,
            options,
        }
    }

    /// Replace the rendering collaborator.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Export the vault into the destination.
    ///
    /// Valid prior progress at the destination is picked up automatically:
    /// the accumulated site is reloaded from its artifacts and completed
    /// batches are skipped. `cancel` is checked once per batch boundary;
    /// the in-flight batch always finishes.
    ///
    /// # Errors
    ///
    /// Fatal conditions only: an unscannable or empty vault, an unwritable
    /// destination, or unpersistable progress. Per-document and per-batch
    /// render failures are recorded in the summary instead.
    pub fn run(
        &self,
        sink: &dyn SiteSink,
        reporter: &dyn ProgressReporter,
        cancel: &AtomicBool,
    ) -> Result<ExportSummary, ExportError> {
        let started = Instant::now();
        sink.ensure_root()?;

        let documents = self.vault.scan().map_err(ExportError::Scan)?;
        if documents.is_empty() {
            return Err(ExportError::EmptyVault);
        }
        reporter.report(&ExportEvent::Scanned {
            documents: documents.len(),
        });

        // The root is resolved once over the full list. Batches reuse it;
        // recomputing over a batch's own subset would yield a deeper prefix
        // and corrupt the layout.
        let root = PathRoot::resolve(&documents);
        debug!(root = %root.as_str(), "resolved shared path root");

        let mut governor = MemoryGovernor::with_watermarks(self.options.watermarks);
        let sample = governor.sample();
        let batch_size = self.options.batch_size.unwrap_or_else(|| {
            if documents.len() <= self.options.chunk_threshold {
                documents.len()
            } else {
                chunk::plan_batch_size(documents.len(), &sample, &governor.watermarks())
            }
        });
        let batches = chunk::partition(documents.len(), batch_size);
        reporter.report(&ExportEvent::Planned {
            batches: batches.len(),
            batch_size,
        });
        info!(
            documents = documents.len(),
            batches = batches.len(),
            batch_size,
            root = %root.as_str(),
            "starting export"
        );

        let ledger = ProgressLedger::new(&self.options.destination)
            .with_max_age(self.options.ledger_max_age);
        let mut record = ProgressRecord::new(batches.len(), &self.options.destination, &documents);
        let mut skip = HashSet::new();
        let mut site = FinalSite::new(root.as_str());
        let mut builder_root = root;

        if self.options.force {
            // An untracked forced run previews from scratch without touching
            // the on-disk state a tracked run would own.
            if self.options.track_progress {
                ledger.clear();
                ResumeCheckpoint::clear(&self.options.destination);
            }
        } else if let Some(prior) = ledger.load()
            && ledger.is_valid(&prior, &documents)
        {
            if prior.total_batches != batches.len() {
                warn!(
                    recorded = prior.total_batches,
                    planned = batches.len(),
                    "prior progress used a different partition; restarting from batch 0"
                );
            } else if let Some((manifest, search)) = load_artifacts(&self.options.destination) {
                builder_root = PathRoot::from_recorded(&manifest.root_path);
                site = FinalSite::from_artifacts(manifest, search);
                skip = prior.completed_batches.iter().copied().collect();
                record = prior;
                info!(
                    completed = skip.len(),
                    total = batches.len(),
                    "resuming from prior progress"
                );
            } else {
                warn!(
                    "prior progress found but site artifacts are unreadable; restarting from batch 0"
                );
            }
        }

        let total_documents = documents.len();
        let state = RunState {
            documents,
            batches,
            site,
            builder: ChunkBuilder::new(Arc::clone(&self.renderer), builder_root),
            governor,
            ledger,
            record,
            skip,
            prior_processed: Vec::new(),
            total_documents,
            started,
        };
        self.drive(state, sink, reporter, cancel)
    }

    /// Re-enter the pipeline from a memory-abort checkpoint.
    ///
    /// The checkpoint's remaining documents become the new input list and
    /// the batch size is halved against the adaptive policy (an explicit
    /// [`ExportOptions::batch_size`] wins unchanged). The accumulated site
    /// is seeded from the artifacts the aborting run finalized; if those
    /// are unreadable the full vault is re-exported instead.
    ///
    /// # Errors
    ///
    /// As for [`run`](Self::run), plus [`ExportError::NothingToResume`]
    /// when none of the checkpoint's remaining documents still exist.
    pub fn resume(
        &self,
        checkpoint: &ResumeCheckpoint,
        sink: &dyn SiteSink,
        reporter: &dyn ProgressReporter,
        cancel: &AtomicBool,
    ) -> Result<ExportSummary, ExportError> {
        let started = Instant::now();
        sink.ensure_root()?;

        let all = self.vault.scan().map_err(ExportError::Scan)?;
        if all.is_empty() {
            return Err(ExportError::EmptyVault);
        }

        let seeded = load_artifacts(&self.options.destination);
        let (documents, site, builder_root, prior_processed, total_documents) = match seeded {
            Some((manifest, search)) => {
                let remaining: HashSet<&String> =
                    checkpoint.remaining_document_paths.iter().collect();
                let documents: Vec<Document> = all
                    .into_iter()
                    .filter(|d| remaining.contains(&d.path_str()))
                    .collect();
                if documents.is_empty() {
                    return Err(ExportError::NothingToResume);
                }
                let root = PathRoot::from_recorded(&manifest.root_path);
                let site = FinalSite::from_artifacts(manifest, search);
                (
                    documents,
                    site,
                    root,
                    checkpoint.processed_document_paths.clone(),
                    checkpoint.total_documents,
                )
            }
            None => {
                warn!("site artifacts missing at destination; re-exporting the full vault");
                let root = PathRoot::resolve(&all);
                let site = FinalSite::new(root.as_str());
                let total = all.len();
                (all, site, root, Vec::new(), total)
            }
        };
        reporter.report(&ExportEvent::Scanned {
            documents: documents.len(),
        });

        let mut governor = MemoryGovernor::with_watermarks(self.options.watermarks);
        let sample = governor.sample();
        let batch_size = match self.options.batch_size {
            Some(size) => size,
            None => {
                let planned =
                    chunk::plan_batch_size(documents.len(), &sample, &governor.watermarks());
                (planned / 2).max(MIN_BATCH_SIZE)
            }
        };
        let batches = chunk::partition(documents.len(), batch_size);
        reporter.report(&ExportEvent::Planned {
            batches: batches.len(),
            batch_size,
        });
        info!(
            remaining = documents.len(),
            total = total_documents,
            batches = batches.len(),
            batch_size,
            "resuming export from checkpoint"
        );

        let ledger = ProgressLedger::new(&self.options.destination)
            .with_max_age(self.options.ledger_max_age);
        let record = ProgressRecord::new(batches.len(), &self.options.destination, &documents);
        let state = RunState {
            documents,
            batches,
            site,
            builder: ChunkBuilder::new(Arc::clone(&self.renderer), builder_root),
            governor,
            ledger,
            record,
            skip: HashSet::new(),
            prior_processed,
            total_documents,
            started,
        };
        self.drive(state, sink, reporter, cancel)
    }

    /// The sequential batch loop shared by [`run`](Self::run) and
    /// [`resume`](Self::resume).
    fn drive(
        &self,
        mut state: RunState,
        sink: &dyn SiteSink,
        reporter: &dyn ProgressReporter,
        cancel: &AtomicBool,
    ) -> Result<ExportSummary, ExportError> {
        let total = state.batches.len();

        // The plan is iterated by value so the loop body can hand the whole
        // state to the cancel and abort exits.
        for batch in state.batches.clone() {
            if cancel.load(Ordering::Relaxed) {
                info!(
                    batch = batch.index,
                    "cancellation requested; stopping at batch boundary"
                );
                return Ok(summarize(state, ExportOutcome::Cancelled));
            }
            if state.skip.contains(&batch.index) {
                reporter.report(&ExportEvent::BatchSkipped {
                    batch: batch.index,
                    total,
                });
                continue;
            }

            let documents = batch.slice(&state.documents);
            let partial = match state.builder.build(batch.index, documents) {
                Ok(partial) => partial,
                Err(BuildError::AllDocumentsFailed { .. }) => {
                    rebuild_in_thirds(&state.builder, batch, documents)
                }
            };
            let batch_failures = partial.failures.len();

            // Merge fully, snapshot the artifacts, then record progress.
            // The ledger write is the commit point: a crash before it
            // re-does this batch, whose entries then dedup as duplicates.
            let stats = state.site.merge_partial(partial, sink)?;
            write_artifacts(&state.site, sink)?;
            state.record.mark_completed(batch.index);
            if self.options.track_progress {
                state.ledger.record(&state.record)?;
            }
            reporter.report(&ExportEvent::BatchCompleted {
                batch: batch.index,
                total,
                pages: stats.pages_added,
                failures: batch_failures,
            });

            let sample = state.governor.sample();
            state.governor.maybe_cleanup(&sample);
            if state.governor.should_abort(&sample) {
                return self.abort(state, sink, reporter, &sample);
            }
        }

        state.site.finalize();
        write_artifacts(&state.site, sink)?;
        if self.options.track_progress {
            state.ledger.clear();
            ResumeCheckpoint::clear(&self.options.destination);
        }
        reporter.report(&ExportEvent::Finalized {
            pages: state.site.page_count(),
            attachments: state.site.attachment_count(),
            failures: state.site.failures().len(),
        });
        info!(
            pages = state.site.page_count(),
            attachments = state.site.attachment_count(),
            failures = state.site.failures().len(),
            elapsed = ?state.started.elapsed(),
            "export complete"
        );
        Ok(summarize(state, ExportOutcome::Completed))
    }

    /// Stop after the in-flight batch: finalize what was merged, write the
    /// artifacts, persist a resume checkpoint, and drop the ledger.
    fn abort(
        &self,
        mut state: RunState,
        sink: &dyn SiteSink,
        reporter: &dyn ProgressReporter,
        sample: &MemorySample,
    ) -> Result<ExportSummary, ExportError> {
        warn!(
            rss_mb = sample.rss_mb(),
            completed = state.record.completed_batches.len(),
            total = state.batches.len(),
            "memory over critical watermark; aborting after in-flight batch"
        );

        state.site.finalize();
        write_artifacts(&state.site, sink)?;

        if self.options.track_progress {
            let mut processed = state.prior_processed.clone();
            let mut remaining = Vec::new();
            for batch in &state.batches {
                let paths = batch.slice(&state.documents).iter().map(Document::path_str);
                if state.record.is_completed(batch.index) {
                    processed.extend(paths);
                } else {
                    remaining.extend(paths);
                }
            }
            let checkpoint = ResumeCheckpoint::new(
                processed,
                remaining,
                state.record.completed_batches.len(),
                state.batches.len(),
                sample.rss_mb(),
                &self.options.destination,
            );
            checkpoint.write(&self.options.destination)?;
            state.ledger.clear();
        }

        reporter.report(&ExportEvent::Aborted {
            completed_batches: state.record.completed_batches.len(),
            rss_mb: sample.rss_mb(),
        });
        Ok(summarize(state, ExportOutcome::MemoryAborted))
    }
}

/// Retry a batch that produced nothing, split into thirds.
///
/// Thirds that still fail contribute their documents as render failures;
/// the combined partial always merges so the run can continue.
fn rebuild_in_thirds(builder: &ChunkBuilder, batch: Batch, documents: &[Document]) -> PartialSite {
    warn!(
        batch = batch.index,
        documents = documents.len(),
        "batch produced no output; retrying in thirds"
    );
    let third = documents.len().div_ceil(3).max(1);
    let mut combined = PartialSite::new(batch.index);
    combined.document_count = documents.len();
    combined.rendered_at = now_seconds();
    for sub in documents.chunks(third) {
        match builder.build(batch.index, sub) {
            Ok(partial) => {
                combined.entries.extend(partial.entries);
                combined.nav_candidates.extend(partial.nav_candidates);
                if let (Some(into), Some(from)) = (combined.search.as_mut(), partial.search) {
                    into.postings.extend(from.postings);
                }
                combined.failures.extend(partial.failures);
            }
            Err(BuildError::AllDocumentsFailed { failures }) => {
                combined.failures.extend(failures);
            }
        }
    }
    combined
}

/// Write the manifest and search index artifacts through the sink.
fn write_artifacts(site: &FinalSite, sink: &dyn SiteSink) -> Result<(), ExportError> {
    let manifest = site.manifest(now_seconds());
    let json = manifest.to_json().map_err(ExportError::Artifact)?;
    sink.write(MANIFEST_FILE, json.as_bytes())?;
    let search = site
        .search()
        .to_artifact_json()
        .map_err(ExportError::Artifact)?;
    sink.write(SEARCH_INDEX_FILE, search.as_bytes())?;
    Ok(())
}

/// Load the prior run's artifacts from the destination, if readable.
fn load_artifacts(destination: &Path) -> Option<(SiteManifest, SearchIndex)> {
    let raw = fs::read_to_string(destination.join(MANIFEST_FILE)).ok()?;
    let manifest: SiteManifest = match serde_json::from_str(&raw) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!(error = %e, "site manifest at destination is malformed");
            return None;
        }
    };
    let search = match fs::read_to_string(destination.join(SEARCH_INDEX_FILE)) {
        Ok(raw) => match SearchIndex::from_artifact_json(&raw) {
            Ok(index) => index,
            Err(e) => {
                warn!(error = %e, "search index at destination is malformed");
                return None;
            }
        },
        Err(e) => {
            warn!(error = %e, "search index artifact unreadable");
            return None;
        }
    };
    Some((manifest, search))
}

fn summarize(state: RunState, outcome: ExportOutcome) -> ExportSummary {
    ExportSummary {
        outcome,
        root_path: state.site.root_path().to_owned(),
        documents: state.total_documents,
        pages: state.site.page_count(),
        attachments: state.site.attachment_count(),
        failures: state.site.failures().to_vec(),
        completed_batches: state.record.completed_batches.len(),
        total_batches: state.batches.len(),
        elapsed: state.started.elapsed(),
    }
}

/// Seconds since the Unix epoch.
fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
