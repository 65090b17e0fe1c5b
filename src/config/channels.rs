use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_option_env};
use crate::error::ConfigError;
use crate::settings::Settings;

const DEFAULT_WEBHOOK_HOST: &str = "127.0.0.1";
const DEFAULT_WEBHOOK_PORT: u16 = 8787;

/// Webhook ingress configuration for an external chat adapter.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
    /// Bearer secret the adapter must present. Auth is disabled when unset.
    pub secret: Option<SecretString>,
}

impl WebhookConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let host = optional_env("TURBOBOT_WEBHOOK_HOST")?
            .or_else(|| settings.webhook.host.clone())
            .unwrap_or_else(|| DEFAULT_WEBHOOK_HOST.to_string());

        let port = parse_option_env::<u16>("TURBOBOT_WEBHOOK_PORT")
            .map_err(|e| match e {
                ConfigError::InvalidValue { key, message } => ConfigError::InvalidValue {
                    key,
                    message: format!("must be a valid port number: {message}"),
                },
                other => other,
            })?
            .or(settings.webhook.port)
            .unwrap_or(DEFAULT_WEBHOOK_PORT);

        let secret = optional_env("TURBOBOT_WEBHOOK_SECRET")?
            .or_else(|| settings.webhook.secret.clone())
            .map(SecretString::from);

        Ok(Self { host, port, secret })
    }
}
