//! `wv inspect` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use wv_config::{CliSettings, Config};
use wv_export::{MANIFEST_FILE, ProgressLedger, ResumeCheckpoint, SEARCH_INDEX_FILE};
use wv_site::{SearchIndex, SiteManifest};

use crate::commands::resolve_config_path;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the inspect command.
#[derive(Args)]
pub(crate) struct InspectArgs {
    /// Vault directory whose destination to inspect (default: from config).
    path: Option<PathBuf>,

    /// Destination directory to inspect (overrides config).
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover wv.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl InspectArgs {
    /// Execute the inspect command.
    ///
    /// Every artifact is reported leniently: a missing or unreadable file is
    /// a line of output, not an error.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source: self.path.clone(),
            destination: self.destination.clone(),
            batch_size: None,
            chunk_threshold: None,
        };
        let config_path = resolve_config_path(self.config.as_deref(), self.path.as_deref());
        let config = Config::load(config_path.as_deref(), Some(&cli_settings))?;

        let destination = &config.export_resolved.destination;
        output.highlight(&format!("Destination: {}", destination.display()));
        if let Some(path) = &config.config_path {
            output.info(&format!("Config: {}", path.display()));
        }
        output.separator();

        report_manifest(&output, destination);
        report_search(&output, destination);
        report_progress(&output, destination);
        report_checkpoint(&output, destination);

        Ok(())
    }
}

fn report_manifest(output: &Output, destination: &Path) {
    match std::fs::read_to_string(destination.join(MANIFEST_FILE)) {
        Ok(text) => match serde_json::from_str::<SiteManifest>(&text) {
            Ok(manifest) => {
                let root = if manifest.root_path.is_empty() {
                    String::new()
                } else {
                    format!(" (root \"{}\")", manifest.root_path)
                };
                output.info(&format!(
                    "Site manifest: {} pages, {} attachments{root}",
                    manifest.page_count, manifest.attachment_count
                ));
                if !manifest.failures.is_empty() {
                    output.warning(&format!(
                        "  {} documents failed in the recorded run",
                        manifest.failures.len()
                    ));
                }
            }
            Err(err) => output.warning(&format!("Site manifest unreadable: {err}")),
        },
        Err(_) => output.info("Site manifest: not present"),
    }
}

fn report_search(output: &Output, destination: &Path) {
    match std::fs::read_to_string(destination.join(SEARCH_INDEX_FILE)) {
        Ok(text) => match SearchIndex::from_artifact_json(&text) {
            Ok(index) => output.info(&format!("Search index: {} entries", index.len())),
            Err(err) => output.warning(&format!("Search index unreadable: {err}")),
        },
        Err(_) => output.info("Search index: not present"),
    }
}

fn report_progress(output: &Output, destination: &Path) {
    match ProgressLedger::new(destination).load() {
        Some(record) => output.info(&format!(
            "Progress ledger: {}/{} batches complete",
            record.completed_batches.len(),
            record.total_batches
        )),
        None => output.info("Progress ledger: none"),
    }
}

fn report_checkpoint(output: &Output, destination: &Path) {
    if !ResumeCheckpoint::path_for(destination).exists() {
        output.info("Checkpoint: none");
        return;
    }
    match ResumeCheckpoint::load(destination) {
        Ok(checkpoint) => output.info(&format!(
            "Checkpoint: {}/{} documents processed ({:.0}%), halted at {} MB resident",
            checkpoint.processed_document_paths.len(),
            checkpoint.total_documents,
            checkpoint.completion_percent,
            checkpoint.abort_memory_mb
        )),
        Err(err) => output.warning(&format!("Checkpoint unreadable: {err}")),
    }
}
