// ABOUTME: Configuration loading for the parley CLI
// ABOUTME: TOML config file with sensible defaults and env overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the agent service
    pub url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Session to resume by default; a fresh one is generated when unset
    pub session: Option<String>,
    /// Minimum milliseconds between visible status changes
    pub status_interval_ms: u64,
    /// How many prior turns are resent with each request
    pub history_window: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            session: None,
            status_interval_ms: 1500,
            history_window: parley_client::HISTORY_WINDOW,
        }
    }
}

impl Config {
    /// Default config file location (~/.config/parley/config.toml).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("parley").join("config.toml"))
    }

    /// Load from the given path, or the default location. A missing file
    /// yields the defaults; a malformed file is an error.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path.or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.url, "http://127.0.0.1:8000");
        assert_eq!(config.chat.status_interval_ms, 1500);
        assert_eq!(config.chat.history_window, 10);
        assert!(config.chat.session.is_none());
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let config = Config::load(Some(PathBuf::from("/nonexistent/parley.toml"))).unwrap();
        assert_eq!(config.server.url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_load_full_file() {
        let content = r#"
[server]
url = "http://agent.local:9000"

[chat]
session = "sess-abc"
status_interval_ms = 800
history_window = 6
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.server.url, "http://agent.local:9000");
        assert_eq!(config.chat.session.as_deref(), Some("sess-abc"));
        assert_eq!(config.chat.status_interval_ms, 800);
        assert_eq!(config.chat.history_window, 6);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let content = r#"
[server]
url = "http://other:8000"
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.server.url, "http://other:8000");
        assert_eq!(config.chat.status_interval_ms, 1500);
    }

    #[test]
    fn test_load_malformed_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[server\nurl = broken").unwrap();
        assert!(Config::load(Some(file.path().to_path_buf())).is_err());
    }
}
