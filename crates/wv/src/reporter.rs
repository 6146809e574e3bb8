//! Console progress reporting for export runs.

use wv_export::{ExportEvent, ProgressReporter};

use crate::output::Output;

/// Prints batch lifecycle events through the styled terminal.
///
/// Shown regardless of `--verbose`; the flag controls `tracing` diagnostics,
/// not run progress.
pub(crate) struct ConsoleReporter {
    output: Output,
}

impl ConsoleReporter {
    pub(crate) fn new() -> Self {
        Self {
            output: Output::new(),
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn report(&self, event: &ExportEvent) {
        match event {
            ExportEvent::Scanned { documents } => {
                self.output.info(&format!("Scanned {documents} documents"));
            }
            ExportEvent::Planned {
                batches,
                batch_size,
            } => {
                self.output.info(&format!(
                    "Planned {batches} batches of up to {batch_size} documents"
                ));
            }
            ExportEvent::BatchSkipped { batch, total } => {
                self.output.info(&format!(
                    "Batch {}/{total} already complete, skipping",
                    batch + 1
                ));
            }
            ExportEvent::BatchCompleted {
                batch,
                total,
                pages,
                failures,
            } => {
                let line = format!("Batch {}/{total} merged ({pages} pages)", batch + 1);
                if *failures > 0 {
                    self.output.warning(&format!("{line}, {failures} failed"));
                } else {
                    self.output.info(&line);
                }
            }
            ExportEvent::Aborted {
                completed_batches,
                rss_mb,
            } => {
                self.output.warning(&format!(
                    "Memory critical at {rss_mb} MB resident; halting after {completed_batches} batches"
                ));
            }
            ExportEvent::Finalized {
                pages,
                attachments,
                failures,
            } => {
                let mut line = format!("Site finalized: {pages} pages, {attachments} attachments");
                if *failures > 0 {
                    line.push_str(&format!(", {failures} documents skipped"));
                }
                self.output.info(&line);
            }
        }
    }
}
