//! File-backed settings.
//!
//! Stores operator overrides in `~/.turbobot/config.toml`. Every field is
//! optional; resolution against env vars and defaults happens in
//! [`crate::config`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings loaded from the TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the Turbo backend API.
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Path to the local credential database.
    #[serde(default)]
    pub database_path: Option<String>,

    /// Display name sent to the backend when a user binds.
    #[serde(default)]
    pub bot_name: Option<String>,

    /// Per-request timeout for backend calls, in milliseconds.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Prefix that marks a chat message as a command.
    #[serde(default)]
    pub command_prefix: Option<String>,

    #[serde(default)]
    pub webhook: WebhookSettings,
}

/// Webhook ingress settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSettings {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Shared bearer secret expected from the chat adapter.
    #[serde(default)]
    pub secret: Option<String>,
}

impl Settings {
    /// Default TOML config file path (~/.turbobot/config.toml).
    pub fn default_toml_path() -> PathBuf {
        crate::bootstrap::turbobot_home().join("config.toml")
    }

    /// Load settings from a TOML file.
    ///
    /// Returns `None` if the file doesn't exist. Returns an error only
    /// if the file exists but can't be parsed.
    pub fn load_toml(path: &Path) -> Result<Option<Self>, String> {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {}", path.display(), e)),
        };

        let settings: Self = toml::from_str(&data)
            .map_err(|e| format!("invalid TOML in {}: {}", path.display(), e))?;
        Ok(Some(settings))
    }

    /// Overlay every value set in `other` on top of `self`.
    pub fn merge_from(&mut self, other: &Self) {
        fn overlay<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }

        overlay(&mut self.api_base_url, &other.api_base_url);
        overlay(&mut self.database_path, &other.database_path);
        overlay(&mut self.bot_name, &other.bot_name);
        overlay(&mut self.request_timeout_ms, &other.request_timeout_ms);
        overlay(&mut self.command_prefix, &other.command_prefix);
        overlay(&mut self.webhook.host, &other.webhook.host);
        overlay(&mut self.webhook.port, &other.webhook.port);
        overlay(&mut self.webhook.secret, &other.webhook.secret);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_path_under_turbobot() {
        let path = Settings::default_toml_path();
        assert!(path.to_string_lossy().contains(".turbobot"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn missing_toml_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_toml(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn parses_nested_webhook_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
api_base_url = "https://turbo.test"
bot_name = "Salt三号机"
request_timeout_ms = 2500

[webhook]
port = 9000
secret = "hunter2"
"#,
        )
        .unwrap();

        let settings = Settings::load_toml(&path).unwrap().unwrap();
        assert_eq!(settings.api_base_url.as_deref(), Some("https://turbo.test"));
        assert_eq!(settings.bot_name.as_deref(), Some("Salt三号机"));
        assert_eq!(settings.request_timeout_ms, Some(2500));
        assert_eq!(settings.webhook.port, Some(9000));
        assert_eq!(settings.webhook.secret.as_deref(), Some("hunter2"));
        assert!(settings.webhook.host.is_none());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base_url = [").unwrap();
        let err = Settings::load_toml(&path).unwrap_err();
        assert!(err.contains("invalid TOML"));
    }

    #[test]
    fn merge_only_overrides_set_values() {
        let mut base = Settings {
            api_base_url: Some("https://a.test".to_string()),
            bot_name: Some("base".to_string()),
            ..Default::default()
        };
        let overlay = Settings {
            bot_name: Some("overlay".to_string()),
            webhook: WebhookSettings {
                port: Some(1234),
                ..Default::default()
            },
            ..Default::default()
        };

        base.merge_from(&overlay);
        assert_eq!(base.api_base_url.as_deref(), Some("https://a.test"));
        assert_eq!(base.bot_name.as_deref(), Some("overlay"));
        assert_eq!(base.webhook.port, Some(1234));
    }
}
