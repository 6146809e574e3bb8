//! Subcommand implementations for the wv binary.

pub(crate) mod export;
pub(crate) mod inspect;
pub(crate) mod resume;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use wv_config::CONFIG_FILENAME;
use wv_export::{ExportOutcome, ExportSummary};

use crate::error::CliError;
use crate::output::Output;

pub(crate) use export::ExportArgs;
pub(crate) use inspect::InspectArgs;
pub(crate) use resume::ResumeArgs;

/// Pick the config file for a run.
///
/// An explicit `--config` wins; otherwise a `wv.toml` inside the vault
/// argument; otherwise `None`, leaving parent-directory discovery to the
/// loader.
pub(crate) fn resolve_config_path(config: Option<&Path>, vault: Option<&Path>) -> Option<PathBuf> {
    if let Some(config) = config {
        return Some(config.to_path_buf());
    }
    let candidate = vault?.join(CONFIG_FILENAME);
    candidate.exists().then_some(candidate)
}

/// Flip `cancel` on Ctrl-C so the loop stops at the next batch boundary.
pub(crate) fn install_cancel_handler(cancel: &Arc<AtomicBool>) -> Result<(), CliError> {
    let flag = Arc::clone(cancel);
    let output = Output::new();
    ctrlc::set_handler(move || {
        output.warning("Stopping after the current batch...");
        flag.store(true, Ordering::Relaxed);
    })?;
    Ok(())
}

/// Print the run outcome through the styled terminal.
pub(crate) fn report_summary(output: &Output, summary: &ExportSummary, dry_run: bool) {
    if !summary.failures.is_empty() {
        output.warning(&format!(
            "{} documents failed to render and were skipped",
            summary.failures.len()
        ));
    }
    match summary.outcome {
        ExportOutcome::Completed => {
            let suffix = if dry_run {
                " (dry run, nothing written)"
            } else {
                ""
            };
            output.success(&format!(
                "Exported {} pages and {} attachments in {:.1?}{suffix}",
                summary.pages, summary.attachments, summary.elapsed
            ));
        }
        ExportOutcome::Cancelled => {
            output.warning(&format!(
                "Cancelled after {}/{} batches ({:.0}%); rerun `wv export` to continue",
                summary.completed_batches,
                summary.total_batches,
                summary.completion_percent()
            ));
        }
        ExportOutcome::MemoryAborted => {
            output.warning(&format!(
                "Halted by the memory governor at {:.0}%; run `wv resume` to continue",
                summary.completion_percent()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_resolve_config_path_explicit_wins() {
        let resolved = resolve_config_path(
            Some(Path::new("/etc/wv/custom.toml")),
            Some(Path::new("/vault")),
        );
        assert_eq!(resolved, Some(PathBuf::from("/etc/wv/custom.toml")));
    }

    #[test]
    fn test_resolve_config_path_finds_vault_config() {
        let tmp = tempfile::tempdir().unwrap();
        let candidate = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(&candidate, "").unwrap();

        let resolved = resolve_config_path(None, Some(tmp.path()));
        assert_eq!(resolved, Some(candidate));
    }

    #[test]
    fn test_resolve_config_path_skips_absent_vault_config() {
        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve_config_path(None, Some(tmp.path()));
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_resolve_config_path_without_hints() {
        assert_eq!(resolve_config_path(None, None), None);
    }
}
