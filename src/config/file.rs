//! TOML configuration file loading
//!
//! Supports `~/.config/autoresponder/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Auto-reply behavior
    #[serde(default)]
    pub responder: ResponderFileConfig,

    /// `WhatsApp` Cloud API settings
    #[serde(default)]
    pub whatsapp: WhatsAppFileConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Auto-reply behavior
#[derive(Debug, Default, Deserialize)]
pub struct ResponderFileConfig {
    /// Text sent as the automatic reply
    pub auto_response_message: Option<String>,

    /// Messages allowed per spam window before suppression
    pub spam_limit: Option<u32>,

    /// Spam window length in milliseconds
    pub spam_time_window_ms: Option<u64>,

    /// Silence after owner activity, in milliseconds
    pub reactivation_time_ms: Option<u64>,
}

/// `WhatsApp` Cloud API settings (the access token is env-only)
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppFileConfig {
    pub phone_number_id: Option<String>,
    pub verify_token: Option<String>,
    pub api_base_url: Option<String>,
    pub owner_number: Option<String>,
}

/// HTTP server settings
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub port: Option<u16>,
    pub webhook_deliveries_per_minute: Option<u32>,
}

impl ConfigFile {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid TOML for this schema
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_from(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match ConfigFile::parse(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/autoresponder/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("autoresponder").join("config.toml"))
}
