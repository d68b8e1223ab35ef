//! Configuration loading
//!
//! Reads a JSON5 file holding the reply settings (flat, camelCase; the
//! PascalCase keys of an existing `settings.json` are accepted too) plus an
//! optional `logging` section. A missing file is not an error; every field
//! has a default.

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::autoreply::config::ReplyConfig;
use crate::logging::LoggingConfig;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "SHOUTBACK_CONFIG_PATH";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Everything the binary reads from its config file
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(flatten)]
    pub reply: ReplyConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Copy with secrets masked
    pub fn redacted(&self) -> Self {
        Self {
            reply: self.reply.redacted(),
            logging: self.logging.clone(),
        }
    }
}

/// Resolve the config path: env override, else `~/.config/shoutback/config.json5`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("shoutback")
        .join("config.json5")
}

/// Parse config text (JSON5, so plain JSON works too)
pub fn parse_config(raw: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut value: Value = json5::from_str(raw).map_err(|e| parse_err(e.to_string()))?;
    let logging = match value.as_object_mut() {
        Some(map) => map.remove("logging"),
        None => return Err(parse_err("top level must be an object".to_string())),
    };

    let reply: ReplyConfig =
        serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))?;
    let logging: LoggingConfig = match logging {
        Some(section) => serde_json::from_value(section).map_err(|e| parse_err(e.to_string()))?,
        None => LoggingConfig::default(),
    };
    Ok(AppConfig { reply, logging })
}

/// Load config from `path`, falling back to defaults when the file does not exist
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => parse_config(&raw, path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(AppConfig::default())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
