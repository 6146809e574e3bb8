//! Batch partitioning.
//!
//! Batch size is a pure function of (document count, memory sample): the
//! step caps bound worst-case peak memory for large sets, and an elevated
//! reading at run start shrinks batches further. Determinism matters here
//! because a resumed run must partition the same document list into the
//! same batches to trust recorded batch indices.

use wv_storage::Document;

use crate::governor::{MemoryPressure, MemorySample, Watermarks};

/// Smallest batch the planner will produce.
pub const MIN_BATCH_SIZE: usize = 10;

/// Document count at or below which the whole list is one batch.
///
/// The cutover point is deliberately tunable; small vaults gain nothing
/// from chunking overhead.
pub const DEFAULT_CHUNK_THRESHOLD: usize = 64;

/// One contiguous, ordered slice of the document list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Batch {
    /// Position in the batch sequence.
    pub index: usize,
    /// First document index, inclusive.
    pub start: usize,
    /// Last document index, exclusive.
    pub end: usize,
}

impl Batch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The documents this batch covers.
    #[must_use]
    pub fn slice<'a>(&self, documents: &'a [Document]) -> &'a [Document] {
        &documents[self.start..self.end]
    }
}

/// Deterministic batch size for a document count under a memory sample.
///
/// Step caps shrink the base size as the set grows; pressure at run start
/// halves or quarters it. Never returns less than [`MIN_BATCH_SIZE`].
#[must_use]
pub fn plan_batch_size(
    document_count: usize,
    sample: &MemorySample,
    watermarks: &Watermarks,
) -> usize {
    let base = if document_count <= 2_000 {
        200
    } else if document_count <= 5_000 {
        100
    } else if document_count <= 10_000 {
        50
    } else {
        25
    };

    let adjusted = match watermarks.pressure_for(sample) {
        MemoryPressure::Normal => base,
        MemoryPressure::Elevated => base / 2,
        MemoryPressure::High | MemoryPressure::Critical => base / 4,
    };

    adjusted.max(MIN_BATCH_SIZE)
}

/// Partition `document_count` documents into ordered contiguous batches.
///
/// Every document lands in exactly one batch, original order preserved; the
/// final batch may be short.
#[must_use]
pub fn partition(document_count: usize, batch_size: usize) -> Vec<Batch> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(document_count.div_ceil(batch_size));
    let mut start = 0;
    let mut index = 0;
    while start < document_count {
        let end = (start + batch_size).min(document_count);
        batches.push(Batch { index, start, end });
        start = end;
        index += 1;
    }
    batches
}
