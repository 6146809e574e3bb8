//! Site accumulation and merging for the WV export engine.
//!
//! A chunked export builds the site in batches: each batch produces a
//! [`PartialSite`], and every partial is folded into one [`FinalSite`]
//! accumulator. This crate owns that accumulation: output entry union,
//! search index membership, navigation tree rebuild, and the site manifest
//! other tooling reads back.
//!
//! # Architecture
//!
//! - [`OutputEntry`] / [`PartialSite`]: batch-scoped build results
//! - [`FinalSite`]: the long-lived accumulator with first-write-wins merging
//! - [`SearchIndex`]: sealed full-text index keyed by output path
//! - [`NavNode`]: navigation tree rebuilt once over the complete path set
//! - [`SiteManifest`]: the durable per-path record artifact
//! - [`SiteSink`]: destination write seam ([`FsSink`] for disk,
//!   [`MemorySink`] for dry runs and tests)
//!
//! Payload bytes flow through the sink at merge time; the accumulator keeps
//! records, not page bodies, so memory stays flat across large runs.

mod entry;
mod final_site;
mod manifest;
mod nav;
mod partial;
mod search;
mod sink;

pub use entry::{EntryKind, NavCandidate, OutputEntry, RenderFailure};
pub use final_site::{FinalSite, MergeError, MergeStats};
pub use manifest::{ManifestFeatures, SiteManifest, SiteRecord};
pub use nav::NavNode;
pub use partial::{PartialSite, SearchContribution, SearchPosting};
pub use search::{FieldPostings, SearchDocument, SearchIndex, tokenize};
pub use sink::{FsSink, MemorySink, SinkError, SiteSink};
