//! Settings persistence for credentials and endpoints.
//!
//! Settings live in a JSON file under the XDG config directory. The
//! socket and REST hosts default to the production deployment; the
//! bearer token and application id have no default and must come from
//! the settings file, the environment, or the command line.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Production host used when no socket URL is configured.
pub const DEFAULT_SOCKET_URL: &str = "https://api.brilliancelearn.com";

/// Production host used when no REST base URL is configured.
pub const DEFAULT_API_URL: &str = "https://api.brilliancelearn.com";

const DEFAULT_CURRICULUM: &str = "Biology";
const DEFAULT_CLASS_LEVEL: &str = "SSS 1";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bearer token presented on the socket handshake and REST calls.
    pub token: String,

    /// Application id presented on the socket handshake.
    pub application_id: String,

    /// Base host for the realtime channel.
    pub socket_url: String,

    /// Base URL for REST endpoints (uploads, conversation groups).
    pub api_url: String,

    /// Subject scope for new conversations.
    pub curriculum: String,

    /// Grade scope for new conversations.
    pub class_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: String::new(),
            application_id: String::new(),
            socket_url: DEFAULT_SOCKET_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            curriculum: DEFAULT_CURRICULUM.to_string(),
            class_level: DEFAULT_CLASS_LEVEL.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, or defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Save settings to a JSON file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Check that the credentials required for a connection are present.
    pub fn ensure_credentials(&self) -> Result<(), SettingsError> {
        if self.token.trim().is_empty() {
            return Err(SettingsError::MissingCredential("token"));
        }
        if self.application_id.trim().is_empty() {
            return Err(SettingsError::MissingCredential("application_id"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_point_at_production() {
        let settings = Settings::default();
        assert_eq!(settings.socket_url, DEFAULT_SOCKET_URL);
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert!(settings.token.is_empty());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(settings.socket_url, DEFAULT_SOCKET_URL);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.token = "tok-123".to_string();
        settings.application_id = "app-456".to_string();
        settings.curriculum = "Physics".to_string();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.token, "tok-123");
        assert_eq!(loaded.application_id, "app-456");
        assert_eq!(loaded.curriculum, "Physics");
        // Untouched fields keep their defaults.
        assert_eq!(loaded.class_level, "SSS 1");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, r#"{"token":"abc"}"#).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.token, "abc");
        assert_eq!(loaded.socket_url, DEFAULT_SOCKET_URL);
    }

    #[test]
    fn test_ensure_credentials() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.ensure_credentials(),
            Err(SettingsError::MissingCredential("token"))
        ));

        settings.token = "tok".to_string();
        assert!(matches!(
            settings.ensure_credentials(),
            Err(SettingsError::MissingCredential("application_id"))
        ));

        settings.application_id = "app".to_string();
        assert!(settings.ensure_credentials().is_ok());
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(SettingsError::Parse(_))
        ));
    }
}
