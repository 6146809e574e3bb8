//! `wv export` command implementation.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Args;
use tracing::debug;
use wv_config::{CliSettings, Config};
use wv_export::{ExportOptions, Exporter, Watermarks};
use wv_render::MarkdownRenderer;
use wv_site::{FsSink, MemorySink};
use wv_storage::{FsVault, VaultStorage};

use crate::commands::{install_cancel_handler, report_summary, resolve_config_path};
use crate::error::CliError;
use crate::output::Output;
use crate::reporter::ConsoleReporter;

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    /// Vault directory to export (default: from config or current directory).
    path: Option<PathBuf>,

    /// Destination directory for the site (overrides config).
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover wv.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixed batch size, overriding the adaptive policy.
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Document count at or below which the whole vault is one batch.
    #[arg(long)]
    chunk_threshold: Option<usize>,

    /// Ignore prior progress and start from batch 0.
    #[arg(short, long)]
    force: bool,

    /// Render and merge in memory without writing to the destination.
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output (show batch lifecycle logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ExportArgs {
    /// Execute the export command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the export aborts fatally.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            source: self.path.clone(),
            destination: self.destination.clone(),
            batch_size: self.batch_size,
            chunk_threshold: self.chunk_threshold,
        };
        let config_path = resolve_config_path(self.config.as_deref(), self.path.as_deref());
        let config = Config::load(config_path.as_deref(), Some(&cli_settings))?;
        debug!(config = ?config.config_path, "configuration loaded");

        let settings = &config.export_resolved;
        output.info(&format!("Vault: {}", settings.source.display()));
        if self.dry_run {
            output.info("Destination: none (dry run)");
        } else {
            output.info(&format!("Destination: {}", settings.destination.display()));
        }

        let mut options = ExportOptions::new(settings.destination.clone());
        options.batch_size = settings.batch_size;
        options.chunk_threshold = settings.chunk_threshold;
        options.force = self.force;
        options.track_progress = !self.dry_run;
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
        let summary = if self.dry_run {
            exporter.run(&MemorySink::new(), &reporter, &cancel)?
        } else {
            exporter.run(&FsSink::new(settings.destination.clone()), &reporter, &cancel)?
        };

        report_summary(&output, &summary, self.dry_run);
        Ok(())
    }
}
