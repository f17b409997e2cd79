//! Service configuration loaded from TOML with environment overrides.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [search]
//! sources = ["google", "11880"]
//! source_timeout_seconds = 20
//!
//! [google]
//! api_key = "..."
//! cse_id = "..."
//! ```
//!
//! `GOOGLE_API_KEY`, `GOOGLE_CSE_ID` and `LEAD_HARVEST_PORT` take
//! precedence over the file.

use std::path::{Path, PathBuf};

use lead_search::AggregatorConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Environment variable overriding `google.api_key`.
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
/// Environment variable overriding `google.cse_id`.
pub const ENV_GOOGLE_CSE_ID: &str = "GOOGLE_CSE_ID";
/// Environment variable overriding `server.port`.
pub const ENV_PORT: &str = "LEAD_HARVEST_PORT";

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener settings.
    pub server: ServerConfig,
    /// Aggregator settings, passed straight to `lead-search`.
    pub search: AggregatorConfig,
    /// Google Custom Search credentials.
    pub google: GoogleConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
        }
    }
}

/// Google Custom Search credentials. The connector is only registered
/// when both the key and the engine id are present.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Custom Search JSON API key.
    pub api_key: Option<String>,
    /// Programmable Search Engine id (`cx`).
    pub cse_id: Option<String>,
    /// Endpoint override, mainly for local testing.
    pub base_url: Option<String>,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("cse_id", &self.cse_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GoogleConfig {
    /// Returns `(api_key, cse_id)` when both are set and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let key = self.api_key.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let cx = self.cse_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((key, cx))
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Load from `path` if it exists (defaults otherwise), apply
    /// environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file is unreadable or invalid, an
    /// override does not parse, or the result fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            tracing::info!(path = %path.display(), "loading config");
            Self::from_file(path)?
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if the port override is not a valid port.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_GOOGLE_API_KEY) {
            self.google.api_key = Some(key);
        }
        if let Some(cx) = lookup(ENV_GOOGLE_CSE_ID) {
            self.google.cse_id = Some(cx);
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| ServiceError::Config(format!("{ENV_PORT}={port:?}: {e}")))?;
        }
        Ok(())
    }

    /// Check the aggregator section.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(ServiceError::Config("server.host must not be empty".into()));
        }
        self.search
            .validate()
            .map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// `host:port` string for binding the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Returns the default config file path: `~/.config/lead-harvest/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("lead-harvest").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("lead-harvest")
                .join("config.toml")
        } else {
            PathBuf::from("lead-harvest.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_search::LeadSource;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert!(config.google.credentials().is_none());
    }

    #[test]
    fn from_file_reads_all_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "0.0.0.0"
port = 9000

[search]
sources = ["11880", "google"]
source_timeout_seconds = 5

[google]
api_key = "file-key"
cse_id = "file-cx"
"#,
        )
        .expect("write config");

        let config = ServiceConfig::from_file(&path).expect("parse");
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(
            config.search.sources,
            vec![LeadSource::Directory11880, LeadSource::Google]
        );
        assert_eq!(config.search.source_timeout_seconds, 5);
        assert_eq!(config.search.default_page_size, 20);
        assert_eq!(config.google.credentials(), Some(("file-key", "file-cx")));
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = ServiceConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ServiceError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").expect("write config");

        let result = ServiceConfig::from_file(&path);
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ServiceConfig::load(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config.search.sources, AggregatorConfig::default().sources);
    }

    #[test]
    fn load_rejects_invalid_search_section() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\nsources = []\n").expect("write config");

        let err = ServiceConfig::load(&path).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = ServiceConfig::default();
        config.google.api_key = Some("file-key".into());

        config
            .apply_overrides(lookup(&[
                (ENV_GOOGLE_API_KEY, "env-key"),
                (ENV_GOOGLE_CSE_ID, "env-cx"),
                (ENV_PORT, "3001"),
            ]))
            .expect("overrides");

        assert_eq!(config.google.credentials(), Some(("env-key", "env-cx")));
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn bad_port_override_rejected() {
        let mut config = ServiceConfig::default();
        let err = config
            .apply_overrides(lookup(&[(ENV_PORT, "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));
    }

    #[test]
    fn blank_credentials_are_absent() {
        let google = GoogleConfig {
            api_key: Some("  ".into()),
            cse_id: Some("cx".into()),
            base_url: None,
        };
        assert!(google.credentials().is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let google = GoogleConfig {
            api_key: Some("secret-key".into()),
            cse_id: Some("cx".into()),
            base_url: None,
        };
        let rendered = format!("{google:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn config_serializes_to_toml() {
        let toml_str = toml::to_string_pretty(&ServiceConfig::default()).expect("serialize");
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("default_page_size"));
    }
}
