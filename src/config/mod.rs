//! Configuration management for the autoresponder gateway
//!
//! Values resolve env > TOML file > default. Thresholds are validated once
//! at load time and again on every reconfigure.

pub mod file;

use std::str::FromStr;

use secrecy::SecretString;
use serde::Serialize;

use crate::{Error, Result};

/// Default automatic reply text
pub const DEFAULT_AUTO_RESPONSE_MESSAGE: &str = "Olá! No momento não estou disponível. Assim que possível irei responder sua mensagem. Obrigado!";

/// Default messages allowed per spam window
pub const DEFAULT_SPAM_LIMIT: u32 = 3;

/// Default spam window (1 minute)
pub const DEFAULT_SPAM_TIME_WINDOW_MS: u64 = 60_000;

/// Default silence after owner activity (30 minutes)
pub const DEFAULT_REACTIVATION_TIME_MS: u64 = 30 * 60 * 1000;

/// Default webhook verification token
pub const DEFAULT_VERIFY_TOKEN: &str = "meu_token_secreto";

/// Default `WhatsApp` Graph API base URL
pub const DEFAULT_WHATSAPP_API_URL: &str = "https://graph.facebook.com/v18.0";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Auto-reply behavior
    pub responder: ResponderConfig,

    /// `WhatsApp` Cloud API settings
    pub whatsapp: WhatsAppConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

/// Auto-reply behavior and abuse-control thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponderConfig {
    /// Text sent as the automatic reply
    pub auto_response_message: String,

    /// Messages allowed per spam window; the next one is spam
    pub spam_limit: u32,

    /// Spam window length in milliseconds
    pub spam_time_window_ms: u64,

    /// Silence after owner activity, in milliseconds
    pub reactivation_time_ms: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            auto_response_message: DEFAULT_AUTO_RESPONSE_MESSAGE.to_string(),
            spam_limit: DEFAULT_SPAM_LIMIT,
            spam_time_window_ms: DEFAULT_SPAM_TIME_WINDOW_MS,
            reactivation_time_ms: DEFAULT_REACTIVATION_TIME_MS,
        }
    }
}

impl ResponderConfig {
    /// Check thresholds
    ///
    /// # Errors
    ///
    /// Returns error if any threshold is zero or the reply text is blank
    pub fn validate(&self) -> Result<()> {
        if self.auto_response_message.trim().is_empty() {
            return Err(Error::Config("auto response message must not be empty".to_string()));
        }
        if self.spam_limit == 0 {
            return Err(Error::Config("spam limit must be greater than zero".to_string()));
        }
        if self.spam_time_window_ms == 0 {
            return Err(Error::Config("spam time window must be greater than zero".to_string()));
        }
        if self.reactivation_time_ms == 0 {
            return Err(Error::Config("reactivation time must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Return a copy with `update` applied
    ///
    /// # Errors
    ///
    /// Returns error if the result fails validation
    pub fn apply(&self, update: &ResponderUpdate) -> Result<Self> {
        let updated = Self {
            auto_response_message: update
                .auto_response_message
                .clone()
                .unwrap_or_else(|| self.auto_response_message.clone()),
            spam_limit: update.spam_limit.unwrap_or(self.spam_limit),
            spam_time_window_ms: update.spam_time_window_ms.unwrap_or(self.spam_time_window_ms),
            reactivation_time_ms: update
                .reactivation_time_ms
                .unwrap_or(self.reactivation_time_ms),
        };
        updated.validate()?;
        Ok(updated)
    }
}

/// Partial runtime change to [`ResponderConfig`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponderUpdate {
    pub auto_response_message: Option<String>,
    pub spam_limit: Option<u32>,
    pub spam_time_window_ms: Option<u64>,
    pub reactivation_time_ms: Option<u64>,
}

/// `WhatsApp` Cloud API settings
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// Business API access token (`WHATSAPP_TOKEN`)
    pub access_token: Option<SecretString>,

    /// Phone number ID used for sending (`WHATSAPP_PHONE_ID`)
    pub phone_number_id: Option<String>,

    /// Token expected during webhook verification
    pub verify_token: SecretString,

    /// Graph API base URL
    pub api_base_url: String,

    /// Owner's phone number; messages from it never get a reply
    pub owner_number: Option<String>,
}

impl WhatsAppConfig {
    /// Whether outbound delivery is configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.access_token.is_some() && self.phone_number_id.is_some()
    }
}

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// API key for admin endpoints (from `AUTORESPONDER_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Webhook deliveries allowed per caller and minute; unlimited when absent
    pub webhook_deliveries_per_minute: Option<u32>,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a value fails to parse or thresholds are invalid
    pub fn load() -> Result<Self> {
        Self::resolve(file::load_config_file(), |name| std::env::var(name).ok())
    }

    /// Resolve configuration from a parsed file and an env lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value fails to parse or thresholds are invalid
    pub fn resolve<F>(fc: file::ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ResponderConfig::default();

        // Responder (env > toml > default)
        let responder = ResponderConfig {
            auto_response_message: env("AUTO_RESPONSE_MESSAGE")
                .or(fc.responder.auto_response_message)
                .unwrap_or(defaults.auto_response_message),
            spam_limit: parse_env(&env, "SPAM_LIMIT")?
                .or(fc.responder.spam_limit)
                .unwrap_or(defaults.spam_limit),
            spam_time_window_ms: parse_env(&env, "SPAM_TIME_WINDOW")?
                .or(fc.responder.spam_time_window_ms)
                .unwrap_or(defaults.spam_time_window_ms),
            reactivation_time_ms: parse_env(&env, "REACTIVATION_TIME")?
                .or(fc.responder.reactivation_time_ms)
                .unwrap_or(defaults.reactivation_time_ms),
        };
        responder.validate()?;

        let verify_token = env("WEBHOOK_VERIFY_TOKEN").or(fc.whatsapp.verify_token);
        if verify_token.is_none() {
            tracing::warn!("WEBHOOK_VERIFY_TOKEN not set, using the default token");
        }

        let whatsapp = WhatsAppConfig {
            access_token: env("WHATSAPP_TOKEN").map(SecretString::from),
            phone_number_id: env("WHATSAPP_PHONE_ID").or(fc.whatsapp.phone_number_id),
            verify_token: SecretString::from(
                verify_token.unwrap_or_else(|| DEFAULT_VERIFY_TOKEN.to_string()),
            ),
            api_base_url: env("WHATSAPP_API_URL")
                .or(fc.whatsapp.api_base_url)
                .unwrap_or_else(|| DEFAULT_WHATSAPP_API_URL.to_string()),
            owner_number: env("OWNER_NUMBER").or(fc.whatsapp.owner_number),
        };

        let port = match parse_env(&env, "AUTORESPONDER_PORT")? {
            Some(port) => Some(port),
            None => parse_env(&env, "PORT")?,
        };

        let server = ServerConfig {
            port: port.or(fc.server.port).unwrap_or(DEFAULT_PORT),
            api_key: env("AUTORESPONDER_API_KEY").map(SecretString::from),
            webhook_deliveries_per_minute: parse_env(&env, "AUTORESPONDER_WEBHOOK_LIMIT")?
                .or(fc.server.webhook_deliveries_per_minute)
                .filter(|per_minute| *per_minute > 0),
        };

        Ok(Self {
            responder,
            whatsapp,
            server,
        })
    }
}

/// Parse an optional env value, rejecting garbage instead of defaulting
fn parse_env<T, F>(env: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    env(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {name} value {raw:?}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn resolve_with(vars: &[(&str, &str)], fc: file::ConfigFile) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::resolve(fc, |name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = resolve_with(&[], file::ConfigFile::default()).unwrap();

        assert_eq!(config.responder, ResponderConfig::default());
        assert_eq!(config.responder.spam_limit, 3);
        assert_eq!(config.responder.spam_time_window_ms, 60_000);
        assert_eq!(config.responder.reactivation_time_ms, 1_800_000);
        assert_eq!(config.whatsapp.verify_token.expose_secret(), DEFAULT_VERIFY_TOKEN);
        assert!(config.server.webhook_deliveries_per_minute.is_none());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(!config.whatsapp.is_configured());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut fc = file::ConfigFile::default();
        fc.responder.spam_limit = Some(10);
        fc.responder.reactivation_time_ms = Some(5_000);

        let config = resolve_with(
            &[
                ("SPAM_LIMIT", "7"),
                ("WHATSAPP_TOKEN", "tok"),
                ("WHATSAPP_PHONE_ID", "123"),
                ("PORT", "8080"),
            ],
            fc,
        )
        .unwrap();

        assert_eq!(config.responder.spam_limit, 7);
        assert_eq!(config.responder.reactivation_time_ms, 5_000);
        assert_eq!(config.server.port, 8080);
        assert!(config.whatsapp.is_configured());
        assert_eq!(
            config.whatsapp.access_token.unwrap().expose_secret(),
            "tok"
        );
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let config = resolve_with(
            &[
                ("WHATSAPP_TOKEN", "EAAG-access-token"),
                ("WEBHOOK_VERIFY_TOKEN", "hub-verify-token"),
                ("AUTORESPONDER_API_KEY", "admin-api-key"),
            ],
            file::ConfigFile::default(),
        )
        .unwrap();

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("EAAG-access-token"));
        assert!(!rendered.contains("hub-verify-token"));
        assert!(!rendered.contains("admin-api-key"));
        assert_eq!(config.server.api_key.unwrap().expose_secret(), "admin-api-key");
    }

    #[test]
    fn test_webhook_limit_from_env() {
        let config =
            resolve_with(&[("AUTORESPONDER_WEBHOOK_LIMIT", "120")], file::ConfigFile::default())
                .unwrap();
        assert_eq!(config.server.webhook_deliveries_per_minute, Some(120));

        let config =
            resolve_with(&[("AUTORESPONDER_WEBHOOK_LIMIT", "0")], file::ConfigFile::default())
                .unwrap();
        assert!(config.server.webhook_deliveries_per_minute.is_none());
    }

    #[test]
    fn test_zero_spam_limit_is_rejected() {
        let err = resolve_with(&[("SPAM_LIMIT", "0")], file::ConfigFile::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unparseable_threshold_is_rejected() {
        let err = resolve_with(&[("REACTIVATION_TIME", "soon")], file::ConfigFile::default())
            .unwrap_err();
        assert!(err.to_string().contains("REACTIVATION_TIME"));
    }

    #[test]
    fn test_blank_message_is_rejected() {
        let err = resolve_with(&[("AUTO_RESPONSE_MESSAGE", "  ")], file::ConfigFile::default())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_apply_partial_update() {
        let base = ResponderConfig::default();
        let updated = base
            .apply(&ResponderUpdate {
                spam_limit: Some(5),
                ..ResponderUpdate::default()
            })
            .unwrap();

        assert_eq!(updated.spam_limit, 5);
        assert_eq!(updated.auto_response_message, base.auto_response_message);
    }
}
