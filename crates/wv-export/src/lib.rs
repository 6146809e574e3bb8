//! Chunked vault export engine.
//!
//! Converts a large vault of interlinked markdown documents into one
//! coherent static site: a unified navigation tree, a merged search index,
//! and a consistent output layout. Rendering a document and collecting its
//! attachments has a high peak memory cost, while the site-level artifacts
//! must be computed over the entire document set to be correct. The engine
//! squares the two by processing the vault in bounded batches that all
//! share globally resolved state.
//!
//! # Architecture
//!
//! - [`PathRoot`] resolves the shared ancestor path once over the full
//!   document list; every batch strips the same prefix.
//! - The chunk planner ([`plan_batch_size`], [`partition`]) splits the list
//!   into ordered batches sized against document count and memory pressure.
//! - [`ChunkBuilder`] renders one batch into a self-contained partial site.
//! - [`wv_site::FinalSite`] accumulates partials; navigation is rebuilt and
//!   the search index sealed once after the last batch.
//! - [`ProgressLedger`] persists completed batch indices between batches so
//!   an interrupted run loses at most one batch of work.
//! - [`MemoryGovernor`] samples process memory after each batch and can
//!   stop the run with a [`ResumeCheckpoint`] instead of crashing.
//! - [`Exporter`] drives the whole loop and owns cancellation, retry, and
//!   resume semantics.
//!
//! Batches are processed strictly sequentially; within a batch, documents
//! render in parallel through the rendering collaborator.

mod builder;
mod checkpoint;
mod chunk;
mod exporter;
mod governor;
mod ledger;
mod paths;
mod reporter;
mod roots;

pub use builder::{BuildError, ChunkBuilder};
pub use checkpoint::{CHECKPOINT_FILE, CheckpointError, ResumeCheckpoint};
pub use chunk::{Batch, DEFAULT_CHUNK_THRESHOLD, MIN_BATCH_SIZE, partition, plan_batch_size};
pub use exporter::{
    ExportError, ExportOptions, ExportOutcome, ExportSummary, Exporter, MANIFEST_FILE,
    SEARCH_INDEX_FILE,
};
pub use governor::{MemoryGovernor, MemoryPressure, MemorySample, Watermarks};
pub use ledger::{
    DEFAULT_MAX_AGE, LedgerError, PROGRESS_FILE, ProgressLedger, ProgressRecord, fingerprint,
};
pub use reporter::{ExportEvent, NoopReporter, ProgressReporter};
pub use roots::PathRoot;
