//! Bootstrap helpers for turbobot.
//!
//! Env vars may be persisted in `~/.turbobot/.env` (standard dotenvy format)
//! so the bridge can be configured before any config file exists.

use std::path::PathBuf;

/// Per-user data directory: `~/.turbobot`.
pub fn turbobot_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".turbobot")
}

/// Path to the turbobot-specific `.env` file: `~/.turbobot/.env`.
pub fn turbobot_env_path() -> PathBuf {
    turbobot_home().join(".env")
}

/// Load env vars from `./.env` and then `~/.turbobot/.env`.
///
/// dotenvy never overwrites existing env vars, so the effective priority is:
///
///   explicit env vars > `./.env` > `~/.turbobot/.env`
pub fn load_turbobot_env() {
    let _ = dotenvy::dotenv();

    let path = turbobot_env_path();
    if path.exists() {
        if let Err(e) = dotenvy::from_path(&path) {
            tracing::warn!("Failed to load {}: {}", path.display(), e);
        }
    }
}
