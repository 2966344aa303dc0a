use crate::error::{Result, ResultExt as _, ScanError};
use crate::pipeline::{DEFAULT_HYDRATION_CONCURRENCY, PipelineOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted defaults for pipeline runs.
///
/// Every field is optional in the file; missing fields take the
/// [`Default`] value. Command-line flags are layered on top.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Only these tables are surfaced when non-empty
    pub allow_list: Vec<String>,
    /// These tables are never surfaced
    pub block_list: Vec<String>,
    pub include_ddls: bool,
    pub include_table_counts: bool,
    /// Full-view requests in flight at once (minimum 1)
    pub hydration_concurrency: usize,
    /// Override for the Dataplex API root, e.g. a local emulator
    pub dataplex_base_url: Option<String>,
    /// Override for the BigQuery API root
    pub bigquery_base_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            allow_list: Vec::new(),
            block_list: Vec::new(),
            include_ddls: false,
            include_table_counts: false,
            hydration_concurrency: DEFAULT_HYDRATION_CONCURRENCY,
            dataplex_base_url: None,
            bigquery_base_url: None,
        }
    }
}

impl Settings {
    /// Validated run options built from these settings.
    ///
    /// # Errors
    ///
    /// [`ScanError::PolicyConfig`] if the lists overlap, [`ScanError::Config`]
    /// if the concurrency is zero.
    pub fn to_options(&self) -> Result<PipelineOptions> {
        PipelineOptions::builder()
            .allow_list(self.allow_list.iter().cloned())
            .block_list(self.block_list.iter().cloned())
            .include_ddls(self.include_ddls)
            .include_table_counts(self.include_table_counts)
            .hydration_concurrency(self.hydration_concurrency)
            .build()
    }
}

/// Default settings file location (`<config dir>/scanlens/config.json`).
///
/// # Errors
///
/// Fails if the platform has no config directory.
pub fn get_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| ScanError::Config("failed to determine config directory".to_owned()))?;
    Ok(base.join("scanlens").join("config.json"))
}

/// Load settings from `path`, or from [`get_config_path`] when `None`.
///
/// A missing file yields the defaults. An unreadable or malformed file is an
/// error rather than a silent fallback.
///
/// # Errors
///
/// [`ScanError::Config`] for malformed JSON, [`ScanError::Io`] for read failures.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_path()?,
    };

    if !path.exists() {
        tracing::debug!("no settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| ScanError::Config(format!("invalid settings in {}: {e}", path.display())))
}

/// Write settings as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Propagates I/O failures.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}
