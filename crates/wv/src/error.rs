//! Errors surfaced by the wv binary.

use wv_config::ConfigError;
use wv_export::{CheckpointError, ExportError};

/// Failure reported to the terminal when a command aborts.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Export(#[from] ExportError),

    #[error("{0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("{0}")]
    Signal(#[from] ctrlc::Error),

    #[error("{0}")]
    Validation(String),
}
