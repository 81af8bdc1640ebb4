//! Client settings: built-in defaults, optionally overridden by a RON file and the CLI.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agriscan_engine::ClientSettings;
use agriscan_logging::{scan_debug, scan_info};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILENAME: &str = "agriscan.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no data directory available; pass --data-dir")]
    NoDataDir,
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// On-disk form; every field is optional and durations are in milliseconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    api_url: Option<String>,
    connect_timeout_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
    max_poll_iterations: Option<u32>,
    max_file_bytes: Option<u64>,
    poll_retries: Option<u32>,
    poll_retry_delay_ms: Option<u64>,
    top_k: Option<u32>,
}

pub fn resolve_data_dir(flag: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    dirs::data_dir()
        .map(|dir| dir.join("agriscan"))
        .ok_or(ConfigError::NoDataDir)
}

/// Loads settings. An explicit `config` path must exist; the default
/// `<data_dir>/agriscan.ron` is optional. `api_url` (flag or environment)
/// beats the file.
pub fn load_settings(
    config: Option<&Path>,
    data_dir: &Path,
    api_url: Option<&str>,
) -> Result<ClientSettings, ConfigError> {
    let file = match config {
        Some(path) => read_file(path)?,
        None => {
            let path = data_dir.join(CONFIG_FILENAME);
            match read_file(&path) {
                Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    scan_debug!("No settings file at {:?}; using defaults", path);
                    SettingsFile::default()
                }
                other => other?,
            }
        }
    };

    let mut settings = apply(file, ClientSettings::default())?;
    if let Some(url) = api_url.filter(|url| !url.trim().is_empty()) {
        settings.base_url = url.to_string();
    }
    scan_info!("Using backend {}", settings.base_url);
    Ok(settings)
}

fn read_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn apply(file: SettingsFile, mut settings: ClientSettings) -> Result<ClientSettings, ConfigError> {
    let millis = Duration::from_millis;
    if let Some(url) = file.api_url {
        settings.base_url = url;
    }
    if let Some(ms) = file.connect_timeout_ms {
        settings.connect_timeout = millis(nonzero(ms, "connect_timeout_ms")?);
    }
    if let Some(ms) = file.request_timeout_ms {
        settings.request_timeout = millis(nonzero(ms, "request_timeout_ms")?);
    }
    if let Some(ms) = file.poll_interval_ms {
        settings.poll_interval = millis(ms);
    }
    if let Some(count) = file.max_poll_iterations {
        settings.max_poll_iterations = nonzero(count, "max_poll_iterations")?;
    }
    if let Some(bytes) = file.max_file_bytes {
        settings.max_file_bytes = nonzero(bytes, "max_file_bytes")?;
    }
    if let Some(retries) = file.poll_retries {
        settings.poll_retries = retries;
    }
    if let Some(ms) = file.poll_retry_delay_ms {
        settings.poll_retry_delay = millis(ms);
    }
    if let Some(k) = file.top_k {
        settings.top_k = nonzero(k, "top_k")?;
    }
    Ok(settings)
}

fn nonzero<T: PartialEq + Default>(value: T, field: &'static str) -> Result<T, ConfigError> {
    if value == T::default() {
        Err(ConfigError::Zero { field })
    } else {
        Ok(value)
    }
}
