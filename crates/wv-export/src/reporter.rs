//! Progress reporting seam for export runs.
//!
//! The exporter emits [`ExportEvent`]s at run milestones; frontends decide
//! how to surface them. The library itself stays silent apart from tracing.

/// A milestone in an export run.
#[derive(Clone, Debug, PartialEq)]
pub enum ExportEvent {
    /// Vault scan finished.
    Scanned {
        /// Markdown documents found.
        documents: usize,
    },
    /// Chunking plan fixed for the run.
    Planned {
        /// Number of batches the run will process.
        batches: usize,
        /// Documents per batch (the last batch may be smaller).
        batch_size: usize,
    },
    /// A batch was skipped because a prior run already completed it.
    BatchSkipped {
        /// Zero-based batch index.
        batch: usize,
        /// Total batches in the plan.
        total: usize,
    },
    /// A batch finished building and merging.
    BatchCompleted {
        /// Zero-based batch index.
        batch: usize,
        /// Total batches in the plan.
        total: usize,
        /// Pages merged from this batch.
        pages: usize,
        /// Documents that failed to render in this batch.
        failures: usize,
    },
    /// Memory pressure forced the run to stop after the current batch.
    Aborted {
        /// Batches completed before the abort.
        completed_batches: usize,
        /// Process resident set size at the abort decision, in MiB.
        rss_mb: u64,
    },
    /// The final site was written.
    Finalized {
        /// Pages in the finished site.
        pages: usize,
        /// Attachments in the finished site.
        attachments: usize,
        /// Documents skipped over the whole run.
        failures: usize,
    },
}

/// Receives progress events during an export.
///
/// Implementations must be cheap and non-blocking; events fire from inside
/// the export loop.
pub trait ProgressReporter: Send + Sync {
    /// Handle one progress event.
    fn report(&self, event: &ExportEvent);
}

/// Reporter that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: &ExportEvent) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;

    struct RecordingReporter {
        events: Mutex<Vec<ExportEvent>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn report(&self, event: &ExportEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_reporter_receives_events_through_dyn() {
        let recorder = RecordingReporter {
            events: Mutex::new(Vec::new()),
        };
        let reporter: &dyn ProgressReporter = &recorder;

        reporter.report(&ExportEvent::Scanned { documents: 4 });
        reporter.report(&ExportEvent::Planned {
            batches: 1,
            batch_size: 200,
        });

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ExportEvent::Scanned { documents: 4 });
    }

    #[test]
    fn test_noop_reporter_accepts_all_variants() {
        let reporter = NoopReporter;
        reporter.report(&ExportEvent::BatchCompleted {
            batch: 0,
            total: 3,
            pages: 25,
            failures: 1,
        });
        reporter.report(&ExportEvent::Aborted {
            completed_batches: 2,
            rss_mb: 1850,
        });
        reporter.report(&ExportEvent::Finalized {
            pages: 50,
            attachments: 3,
            failures: 1,
        });
    }
}
