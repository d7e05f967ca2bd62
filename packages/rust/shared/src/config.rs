//! Application configuration for globdef.
//!
//! User config lives at `~/.globdef/globdef.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GlobdefError, Result};
use crate::types::DEFAULT_SIDECAR_SUFFIX;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "globdef.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".globdef";

// ---------------------------------------------------------------------------
// Config structs (matching globdef.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Data directory and sidecar settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Remote text-enrichment service settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Scheduler limits.
    #[serde(default)]
    pub scheduler: SchedulerSection,
}

/// `[data]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Suffix appended to a data file's name to form its sidecar name.
    #[serde(default = "default_sidecar_suffix")]
    pub sidecar_suffix: String,

    /// Root ontology (RDF/JSON) contributing goal-type subclass edges.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            sidecar_suffix: default_sidecar_suffix(),
            ontology: None,
        }
    }
}

fn default_sidecar_suffix() -> String {
    DEFAULT_SIDECAR_SUFFIX.into()
}

/// `[remote]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Enhancement endpoint receiving the POSTed file content.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Language hint passed as a query parameter.
    #[serde(default = "default_language")]
    pub language: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whether the remote enhancer is registered at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            language: default_language(),
            timeout_secs: default_timeout_secs(),
            enabled: true,
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:8080/enhancer".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    /// Successful steps a single bundle may take in one run.
    #[serde(default = "default_max_steps")]
    pub max_steps_per_bundle: usize,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            max_steps_per_bundle: default_max_steps(),
        }
    }
}

fn default_max_steps() -> usize {
    100
}

// ---------------------------------------------------------------------------
// Remote enhancer config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime remote enhancer configuration with a validated endpoint.
#[derive(Debug, Clone)]
pub struct RemoteEnhancerConfig {
    /// Parsed endpoint URL.
    pub endpoint: Url,
    /// Language hint.
    pub language: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl TryFrom<&RemoteConfig> for RemoteEnhancerConfig {
    type Error = GlobdefError;

    fn try_from(config: &RemoteConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            GlobdefError::config(format!("invalid remote endpoint '{}': {e}", config.endpoint))
        })?;
        if config.timeout_secs == 0 {
            return Err(GlobdefError::config("remote timeout_secs must be positive"));
        }
        Ok(Self {
            endpoint,
            language: config.language.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.globdef/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| GlobdefError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.globdef/globdef.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| GlobdefError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| GlobdefError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| GlobdefError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| GlobdefError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| GlobdefError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
