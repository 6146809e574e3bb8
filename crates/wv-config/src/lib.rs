//! Configuration for WV.
//!
//! Deserializes `wv.toml` with serde, walking parent directories to find the
//! file when no explicit path is given. Command-line flags override file
//! values through [`CliSettings`].
//!
//! ## Environment Variables
//!
//! `${VAR}` references in string values are substituted at load time, with
//! `${VAR:-fallback}` taking the fallback when unset. The path fields
//! `export.source` and `export.destination` additionally expand a leading
//! `~` to the home directory.

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Command-line overrides applied on top of the loaded file.
///
/// A `None` field leaves the corresponding file value in place.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the vault source directory.
    pub source: Option<PathBuf>,
    /// Override the site destination directory.
    pub destination: Option<PathBuf>,
    /// Override the fixed batch size.
    pub batch_size: Option<usize>,
    /// Override the single-batch document threshold.
    pub chunk_threshold: Option<usize>,
}

/// Filename looked up during config discovery.
pub const CONFIG_FILENAME: &str = "wv.toml";

/// Default destination directory, relative to the vault root.
const DEFAULT_DESTINATION: &str = ".wv/site";

/// Default document count at or below which a run is a single batch.
const DEFAULT_CHUNK_THRESHOLD: usize = 64;

/// Top-level configuration for an export run.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Export configuration (paths are relative strings from TOML).
    #[serde(default)]
    export: ExportConfigRaw,
    /// Memory governor thresholds.
    pub memory: MemoryConfig,
    /// Progress ledger tuning.
    pub ledger: LedgerConfig,
    /// Markdown rendering flags.
    pub render: RenderConfig,

    /// Resolved export configuration (set after loading).
    #[serde(skip)]
    pub export_resolved: ExportConfig,
    /// Where the file was found, when one was loaded.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw export configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExportConfigRaw {
    source: Option<String>,
    destination: Option<String>,
    chunk_threshold: Option<usize>,
    batch_size: Option<usize>,
}

/// Resolved export configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ExportConfig {
    /// Vault directory scanned for documents.
    pub source: PathBuf,
    /// Destination root the site is written under.
    pub destination: PathBuf,
    /// Document count at or below which the run is a single batch.
    pub chunk_threshold: usize,
    /// Fixed batch size overriding the adaptive policy.
    pub batch_size: Option<usize>,
}

/// Memory governor thresholds as fractions of total system memory.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Fraction at which routine cleanup starts.
    pub low: f64,
    /// Fraction at which aggressive cleanup starts.
    pub high: f64,
    /// Fraction at which the run aborts to a resumable checkpoint.
    pub critical: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            low: 0.70,
            high: 0.85,
            critical: 0.95,
        }
    }
}

/// Progress ledger tuning.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Hours before a prior progress record is ignored.
    pub max_age_hours: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { max_age_hours: 24 }
    }
}

impl LedgerConfig {
    /// Staleness bound as a [`Duration`].
    #[must_use]
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(60 * 60))
    }
}

/// Markdown rendering flags.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Enable GitHub-flavored Markdown extensions (tables, strikethrough,
    /// task lists).
    pub gfm: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { gfm: true }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// A `${VAR}` reference could not be resolved.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`export.source`").
        field: String,
        /// Error message (e.g., "${`WV_VAULT`} not set").
        message: String,
    },
}

/// Rejects empty strings so a blank TOML value cannot stand in for a path.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration, folding in any command-line overrides.
    ///
    /// An explicit `config_path` is loaded directly; otherwise `wv.toml` is
    /// discovered by walking up from the current directory, falling back to
    /// defaults when no file exists. Overrides are applied last so flags win
    /// over file values.
    ///
    /// # Errors
    ///
    /// Returns an error when an explicit `config_path` is missing, or when the
    /// file fails to parse or validate.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Fold command-line overrides into the resolved values.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source) = &settings.source {
            self.export_resolved.source.clone_from(source);
            // A destination the file never named stays inside the vault.
            if self.export.destination.is_none() {
                self.export_resolved.destination = source.join(DEFAULT_DESTINATION);
            }
        }
        if let Some(destination) = &settings.destination {
            self.export_resolved.destination.clone_from(destination);
        }
        if let Some(batch_size) = settings.batch_size {
            self.export_resolved.batch_size = Some(batch_size);
        }
        if let Some(chunk_threshold) = settings.chunk_threshold {
            self.export_resolved.chunk_threshold = chunk_threshold;
        }
    }

    /// Walk up from the current directory until a `wv.toml` appears.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Defaults anchored at the current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Defaults anchored at `base`: the vault is `base` itself and the site
    /// lands under it.
    fn default_with_base(base: &Path) -> Self {
        Self {
            export: ExportConfigRaw::default(),
            memory: MemoryConfig::default(),
            ledger: LedgerConfig::default(),
            render: RenderConfig::default(),
            export_resolved: ExportConfig {
                source: base.to_path_buf(),
                destination: base.join(DEFAULT_DESTINATION),
                chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
                batch_size: None,
            },
            config_path: None,
        }
    }

    /// Parse one file and run the full resolution pipeline on it.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // References must be gone before paths are anchored
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Check the loaded values for contradictions.
    ///
    /// Runs automatically at the end of a file load; exposed so callers that
    /// mutate a [`Config`] by hand can re-check it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_export()?;
        self.validate_memory()?;
        self.validate_ledger()?;
        Ok(())
    }

    /// Validate export configuration.
    fn validate_export(&self) -> Result<(), ConfigError> {
        if let Some(source) = self.export.source.as_deref() {
            require_non_empty(source, "export.source")?;
        }
        if let Some(destination) = self.export.destination.as_deref() {
            require_non_empty(destination, "export.destination")?;
        }
        if self.export_resolved.chunk_threshold == 0 {
            return Err(ConfigError::Validation(
                "export.chunk_threshold cannot be 0".to_owned(),
            ));
        }
        if self.export_resolved.batch_size == Some(0) {
            return Err(ConfigError::Validation(
                "export.batch_size cannot be 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Validate memory governor thresholds.
    fn validate_memory(&self) -> Result<(), ConfigError> {
        let MemoryConfig { low, high, critical } = self.memory;
        if !(low > 0.0 && low <= high && high <= critical && critical <= 1.0) {
            return Err(ConfigError::Validation(
                "memory watermarks must satisfy 0 < low <= high <= critical <= 1".to_owned(),
            ));
        }
        Ok(())
    }

    /// Validate ledger tuning.
    fn validate_ledger(&self) -> Result<(), ConfigError> {
        if self.ledger.max_age_hours == 0 {
            return Err(ConfigError::Validation(
                "ledger.max_age_hours cannot be 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Substitute `${VAR}` references in the raw path strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(source) = self.export.source.take() {
            self.export.source = Some(expand::expand_path(&source, "export.source")?);
        }
        if let Some(destination) = self.export.destination.take() {
            self.export.destination =
                Some(expand::expand_path(&destination, "export.destination")?);
        }
        Ok(())
    }

    /// Anchor relative paths at the config file's directory.
    ///
    /// An unset source means the vault is the config file's own directory; an
    /// unset destination lands inside the vault, where the scanner never looks.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let source = match self.export.source.as_deref() {
            Some(source) => config_dir.join(source),
            None => config_dir.to_path_buf(),
        };
        let destination = match self.export.destination.as_deref() {
            Some(destination) => config_dir.join(destination),
            None => source.join(DEFAULT_DESTINATION),
        };
        self.export_resolved = ExportConfig {
            source,
            destination,
            chunk_threshold: self.export.chunk_threshold.unwrap_or(DEFAULT_CHUNK_THRESHOLD),
            batch_size: self.export.batch_size,
        };
    }
}
