//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument or environment variable (clap handles both)
//! 2. TOML config file (`--config`, else `~/.config/facereg/config.toml`)
//! 3. Compiled defaults
//!
//! A missing default config file is not an error; the service starts on
//! compiled defaults. A config file named explicitly must exist and parse.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Compiled default values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub inference_url: String,
    pub chat_url: String,
    pub frontend_url: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_path: default_database_path(),
            inference_url: "http://localhost:5001".to_string(),
            chat_url: "ws://localhost:5002/ws".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
        }
    }
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("facereg").join("facereg.db"))
        .unwrap_or_else(|| PathBuf::from("./facereg_data/facereg.db"))
}

/// Default TOML config location (`~/.config/facereg/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("facereg").join("config.toml"))
}

/// Contents of the TOML config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<PathBuf>,
    pub inference_url: Option<String>,
    /// Empty string disables the chat bridge
    pub chat_url: Option<String>,
    pub frontend_url: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
}

/// Settings supplied on the command line or through the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<PathBuf>,
    pub inference_url: Option<String>,
    pub chat_url: Option<String>,
    pub frontend_url: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
}

/// Fully resolved API server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// Base URL of the inference service (`/encode`, `/recognize`)
    pub inference_url: String,
    /// WebSocket URL of the chat service; `None` disables the chat bridge
    pub chat_url: Option<String>,
    /// Allowed CORS origin
    pub frontend_url: String,
    /// Per-request timeout for collaborator calls; `None` leaves transport defaults
    pub upstream_timeout: Option<Duration>,
}

impl ServiceConfig {
    /// Merge overrides, TOML and compiled defaults (highest priority first)
    pub fn resolve(overrides: ConfigOverrides, toml: Option<TomlConfig>) -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        let toml = toml.unwrap_or_default();

        let chat_url = overrides
            .chat_url
            .or(toml.chat_url)
            .unwrap_or(defaults.chat_url);

        Self {
            host: overrides.host.or(toml.host).unwrap_or(defaults.host),
            port: overrides.port.or(toml.port).unwrap_or(defaults.port),
            database_path: overrides
                .database
                .or(toml.database)
                .unwrap_or(defaults.database_path),
            inference_url: trim_trailing_slash(
                overrides
                    .inference_url
                    .or(toml.inference_url)
                    .unwrap_or(defaults.inference_url),
            ),
            chat_url: if chat_url.trim().is_empty() {
                None
            } else {
                Some(chat_url)
            },
            frontend_url: overrides
                .frontend_url
                .or(toml.frontend_url)
                .unwrap_or(defaults.frontend_url),
            upstream_timeout: overrides
                .upstream_timeout_secs
                .or(toml.upstream_timeout_secs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn trim_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Load the TOML config file
///
/// `explicit` comes from `--config`/`FACEREG_CONFIG` and must exist. Without
/// it, the default location is tried and silently skipped when absent.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<Option<TomlConfig>> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                info!("No config file found, using compiled defaults");
                return Ok(None);
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => {
            info!("Loaded config file: {}", path.display());
            Ok(Some(config))
        }
        Err(e) if explicit.is_none() => {
            warn!("Ignoring unparseable config file {}: {}", path.display(), e);
            Ok(None)
        }
        Err(e) => Err(Error::Config(format!(
            "Parse {} failed: {}",
            path.display(),
            e
        ))),
    }
}
