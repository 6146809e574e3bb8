//! `wv resume` command implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Args;
use tracing::debug;
use wv_config::{CliSettings, Config};
use wv_export::{ExportOptions, Exporter, ResumeCheckpoint, Watermarks};
use wv_render::MarkdownRenderer;
use wv_site::FsSink;
use wv_storage::{FsVault, VaultStorage};

use crate::commands::{install_cancel_handler, report_summary, resolve_config_path};
use crate::error::CliError;
use crate::output::Output;
use crate::reporter::ConsoleReporter;

/// Arguments for the resume command.
#[derive(Args)]
pub(crate) struct ResumeArgs {
    /// Vault directory the halted export was reading (default: from config).
    path: Option<PathBuf>,

    /// Destination directory holding the checkpoint (overrides config).
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover wv.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixed batch size, overriding the halved adaptive policy.
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Enable verbose output (show batch lifecycle logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ResumeArgs {
    /// Execute the resume command.
    ///
    /// # Errors
    ///
    /// Returns an error if no checkpoint exists at the destination, if
    /// configuration fails, or if the export aborts fatally.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source: self.path.clone(),
            destination: self.destination.clone(),
            batch_size: self.batch_size,
            chunk_threshold: None,
        };
        let config_path = resolve_config_path(self.config.as_deref(), self.path.as_deref());
        let config = Config::load(config_path.as_deref(), Some(&cli_settings))?;
        debug!(config = ?config.config_path, "configuration loaded");

        let settings = &config.export_resolved;
        if !ResumeCheckpoint::path_for(&settings.destination).exists() {
            return Err(CliError::Validation(format!(
                "no checkpoint at {}; run `wv export` instead",
                settings.destination.display()
            )));
        }
        let checkpoint = ResumeCheckpoint::load(&settings.destination)?;

        output.info(&format!("Vault: {}", settings.source.display()));
        output.info(&format!("Destination: {}", settings.destination.display()));
        output.info(&format!(
            "Checkpoint: {} of {} documents processed ({:.0}%)",
            checkpoint.processed_document_paths.len(),
            checkpoint.total_documents,
            checkpoint.completion_percent
        ));

        let mut options = ExportOptions::new(settings.destination.clone());
        options.batch_size = settings.batch_size;
        options.chunk_threshold = settings.chunk_threshold;
        options.watermarks = Watermarks {
            low: config.memory.low,
            high: config.memory.high,
            critical: config.memory.critical,
        };
        options.ledger_max_age = config.ledger.max_age();

        let vault: Arc<dyn VaultStorage> = Arc::new(FsVault::new(settings.source.clone()));
        let renderer = MarkdownRenderer::new(Arc::clone(&vault)).with_gfm(config.render.gfm);
        let exporter = Exporter::new(vault, options).with_renderer(Arc::new(renderer));

        let cancel = Arc::new(AtomicBool::new(false));
        install_cancel_handler(&cancel)?;

        let reporter = ConsoleReporter::new();
        let sink = FsSink::new(settings.destination.clone());
        let summary = exporter.resume(&checkpoint, &sink, &reporter, &cancel)?;

        report_summary(&output, &summary, false);
        Ok(())
    }
}
