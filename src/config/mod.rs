//! Configuration for turbobot.
//!
//! Settings are loaded with priority: env var > TOML config file > default.
//! The resolved [`Config`] is built once at startup and handed to every
//! component by reference; nothing reads configuration ambiently.

mod channels;
pub(crate) mod helpers;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::settings::Settings;

pub use self::channels::WebhookConfig;

const DEFAULT_API_BASE_URL: &str = "https://api.mai-turbo.net";
const DEFAULT_BOT_NAME: &str = "Salt二号机";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_COMMAND_PREFIX: &str = "/";

/// Main configuration for the bridge.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub store: StoreConfig,
    pub bot: BotConfig,
    pub webhook: WebhookConfig,
}

/// Turbo backend connection settings.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL without a trailing slash; endpoint paths are appended verbatim.
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let raw_url = helpers::optional_env("TURBOBOT_API_BASE_URL")?
            .or_else(|| settings.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = normalize_base_url(&raw_url, "TURBOBOT_API_BASE_URL")?;

        let timeout_ms = helpers::parse_option_env::<u64>("TURBOBOT_REQUEST_TIMEOUT_MS")?
            .or(settings.request_timeout_ms)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TURBOBOT_REQUEST_TIMEOUT_MS".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Local credential store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

impl StoreConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let database_path = helpers::optional_env("TURBOBOT_DATABASE_PATH")?
            .or_else(|| settings.database_path.clone())
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);
        Ok(Self { database_path })
    }
}

/// Chat-facing identity of the bot.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Name registered with the backend on bind.
    pub bot_name: String,
    pub command_prefix: String,
}

impl BotConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let bot_name = helpers::optional_env("TURBOBOT_BOT_NAME")?
            .or_else(|| settings.bot_name.clone())
            .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string());

        let command_prefix = helpers::optional_env("TURBOBOT_COMMAND_PREFIX")?
            .or_else(|| settings.command_prefix.clone())
            .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string());
        if command_prefix.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "TURBOBOT_COMMAND_PREFIX".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(Self {
            bot_name,
            command_prefix: command_prefix.trim().to_string(),
        })
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_name: DEFAULT_BOT_NAME.to_string(),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
        }
    }
}

fn normalize_base_url(raw: &str, key: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("invalid URL '{raw}': {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an http(s) URL, got '{raw}'"),
        });
    }
    Ok(trimmed.to_string())
}

/// Default credential database path (~/.turbobot/botKey.db).
pub fn default_database_path() -> PathBuf {
    crate::bootstrap::turbobot_home().join("botKey.db")
}

impl Config {
    /// Load configuration from env vars and the default TOML file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_toml(None)
    }

    /// Load from env with an optional TOML config file overlay.
    ///
    /// If `toml_path` is `Some`, a missing or unparseable file is fatal.
    /// Otherwise `~/.turbobot/config.toml` is tried and a missing file is
    /// ignored.
    pub fn from_env_with_toml(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        crate::bootstrap::load_turbobot_env();

        let mut settings = Settings::default();
        Self::apply_toml_overlay(&mut settings, toml_path)?;
        Self::build(&settings)
    }

    fn apply_toml_overlay(
        settings: &mut Settings,
        explicit_path: Option<&Path>,
    ) -> Result<(), ConfigError> {
        let path = explicit_path
            .map(PathBuf::from)
            .unwrap_or_else(Settings::default_toml_path);

        match Settings::load_toml(&path) {
            Ok(Some(toml_settings)) => {
                settings.merge_from(&toml_settings);
                tracing::debug!("Loaded TOML config from {}", path.display());
            }
            Ok(None) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
            }
            Err(e) => {
                if explicit_path.is_some() {
                    return Err(ConfigError::ParseError(e));
                }
                tracing::warn!("Failed to load default config file: {}", e);
            }
        }
        Ok(())
    }

    /// Build config from settings.
    pub fn build(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            backend: BackendConfig::resolve(settings)?,
            store: StoreConfig::resolve(settings)?,
            bot: BotConfig::resolve(settings)?,
            webhook: WebhookConfig::resolve(settings)?,
        })
    }
}
