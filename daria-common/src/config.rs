//! Configuration loading and data root resolution
//!
//! Every setting follows the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

pub const ENV_DATA_ROOT: &str = "DARIA_DATA_ROOT";
pub const ENV_BASE_URL: &str = "DARIA_BASE_URL";
pub const ENV_CONFIG: &str = "DARIA_CONFIG";

pub const DEFAULT_DATA_ROOT: &str = "data";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5025";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_INGEST_PATH: &str = "/api/semantic_ingest";
pub const DEFAULT_SESSIONS_PATH: &str = "/api/sessions";
pub const DEFAULT_ANALYSIS_ENDPOINTS: [&str; 2] = [
    "/api/session/{id}/analyze",
    "/api/research_session/{id}/analyze",
];

/// Configuration file contents; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root holding `interviews/` and `interviews/sessions/`
    #[serde(default)]
    pub data_root: Option<PathBuf>,

    /// Base URL of the semantic analysis service
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Minimum spacing between outbound requests (0 disables)
    #[serde(default)]
    pub request_interval_ms: Option<u64>,

    #[serde(default)]
    pub ingest_path: Option<String>,

    #[serde(default)]
    pub sessions_path: Option<String>,

    /// Analysis endpoint templates, tried in order; `{id}` is the session id
    #[serde(default)]
    pub analysis_endpoints: Option<Vec<String>>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load the TOML configuration
///
/// An explicit path must exist and parse. Without one, the platform config
/// file is used when present, otherwise all defaults apply.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return read_toml_config(path);
    }

    match default_config_file() {
        Some(path) => read_toml_config(&path),
        None => Ok(TomlConfig::default()),
    }
}

/// Read and parse one TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// First existing platform config file
///
/// `~/.config/daria/daria.toml`, then `/etc/daria/daria.toml` on Unix.
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("daria").join("daria.toml"));
    if let Some(path) = user_config {
        if path.is_file() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/daria/daria.toml");
        if system_config.is_file() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the data root: CLI → `DARIA_DATA_ROOT` → TOML → `./data`
pub fn resolve_data_root(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Some(path) = non_empty_env(ENV_DATA_ROOT) {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.data_root {
        return path.clone();
    }

    PathBuf::from(DEFAULT_DATA_ROOT)
}

/// Resolve the service base URL: CLI → `DARIA_BASE_URL` → TOML → default
///
/// The URL must use http or https; a trailing slash is dropped.
pub fn resolve_base_url(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let raw = cli_arg
        .map(str::to_string)
        .or_else(|| non_empty_env(ENV_BASE_URL))
        .or_else(|| toml_config.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "base URL must start with http:// or https://, got {:?}",
            raw
        )));
    }
    Ok(trimmed.to_string())
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Session and guide directories derived from a data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub sessions_dir: PathBuf,
    pub guides_dir: PathBuf,
}

impl DataLayout {
    /// `<root>/interviews` for guides, `<root>/interviews/sessions` for sessions
    pub fn from_root(data_root: &Path) -> Self {
        let guides_dir = data_root.join("interviews");
        let sessions_dir = guides_dir.join("sessions");
        Self {
            sessions_dir,
            guides_dir,
        }
    }

    /// Layout with explicit directory overrides applied
    pub fn with_overrides(
        data_root: &Path,
        sessions_dir: Option<&Path>,
        guides_dir: Option<&Path>,
    ) -> Self {
        let mut layout = Self::from_root(data_root);
        if let Some(dir) = sessions_dir {
            layout.sessions_dir = dir.to_path_buf();
        }
        if let Some(dir) = guides_dir {
            layout.guides_dir = dir.to_path_buf();
        }
        layout
    }
}

/// Resolved settings for talking to the analysis service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub request_interval: Duration,
    pub ingest_path: String,
    pub sessions_path: String,
    pub analysis_endpoints: Vec<String>,
}

impl ServiceConfig {
    /// Defaults for a given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            request_interval: Duration::ZERO,
            ingest_path: DEFAULT_INGEST_PATH.to_string(),
            sessions_path: DEFAULT_SESSIONS_PATH.to_string(),
            analysis_endpoints: DEFAULT_ANALYSIS_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Merge CLI values over the TOML file over compiled defaults
    pub fn resolve(
        cli_base_url: Option<&str>,
        cli_timeout_secs: Option<u64>,
        toml_config: &TomlConfig,
    ) -> Result<Self> {
        let mut config = Self::new(resolve_base_url(cli_base_url, toml_config)?);

        if let Some(secs) = cli_timeout_secs.or(toml_config.request_timeout_secs) {
            if secs == 0 {
                return Err(Error::Config("request timeout must be positive".to_string()));
            }
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = toml_config.request_interval_ms {
            config.request_interval = Duration::from_millis(ms);
        }
        if let Some(path) = &toml_config.ingest_path {
            config.ingest_path = path.clone();
        }
        if let Some(path) = &toml_config.sessions_path {
            config.sessions_path = path.clone();
        }
        if let Some(endpoints) = &toml_config.analysis_endpoints {
            if endpoints.is_empty() {
                return Err(Error::Config(
                    "analysis_endpoints must list at least one template".to_string(),
                ));
            }
            if let Some(bad) = endpoints.iter().find(|e| !e.contains("{id}")) {
                return Err(Error::Config(format!(
                    "analysis endpoint {:?} has no {{id}} placeholder",
                    bad
                )));
            }
            config.analysis_endpoints = endpoints.clone();
        }

        Ok(config)
    }
}
