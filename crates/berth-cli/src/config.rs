//! Client configuration.
//!
//! Resolved once in `main` from defaults, an optional JSON file and
//! command-line/environment overrides, then passed by value to the session
//! transport, the submitter and the orchestrator.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

/// Default submission API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3333";

/// Default session channel address.
pub const DEFAULT_SESSION_ADDR: &str = "localhost:3000";

/// Default namespace for namespaced kinds.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the submission API.
    pub api_url: String,
    /// `host:port` of the session channel.
    pub session_addr: String,
    /// Persisted auth token, sent on both channels.
    pub token: Option<String>,
    /// Namespace used when `--namespace` is not given.
    pub default_namespace: String,
    /// Verbose protocol logging.
    pub debug: bool,
    /// Deadline for opening and authenticating the session.
    pub connect_timeout_secs: u64,
    /// Deadline for the submission ack.
    pub submit_timeout_secs: u64,
    /// Deadline for the result on the session channel.
    pub receive_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_addr: DEFAULT_SESSION_ADDR.to_string(),
            token: None,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            debug: false,
            connect_timeout_secs: 10,
            submit_timeout_secs: 30,
            receive_timeout_secs: 300,
        }
    }
}

/// Values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Submission API base URL.
    pub api_url: Option<String>,
    /// Session channel address.
    pub session_addr: Option<String>,
    /// Auth token.
    pub token: Option<String>,
    /// Force debug logging on.
    pub debug: bool,
}

impl ClientConfig {
    /// Load a config file.
    ///
    /// Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            CliError::Config(format!("invalid config {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Resolve the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, CliError> {
        let base = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        let config = base.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides on top of this config.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(api_url) = overrides.api_url {
            self.api_url = api_url;
        }
        if let Some(session_addr) = overrides.session_addr {
            self.session_addr = session_addr;
        }
        if overrides.token.is_some() {
            self.token = overrides.token;
        }
        self.debug |= overrides.debug;
        self
    }

    /// Check the configuration for obvious mistakes.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), CliError> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(CliError::Config(format!(
                "invalid api URL: {}, must start with http:// or https://",
                self.api_url
            )));
        }
        if self.session_addr.is_empty() || !self.session_addr.contains(':') {
            return Err(CliError::Config(format!(
                "invalid session address: {:?}, expected host:port",
                self.session_addr
            )));
        }
        if self.default_namespace.is_empty() {
            return Err(CliError::Config("default namespace cannot be empty".into()));
        }
        if self.connect_timeout_secs == 0
            || self.submit_timeout_secs == 0
            || self.receive_timeout_secs == 0
        {
            return Err(CliError::Config("timeouts must be at least one second".into()));
        }
        Ok(())
    }

    /// Session open and authentication deadline.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Submission ack deadline.
    #[must_use]
    pub const fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    /// Result deadline.
    #[must_use]
    pub const fn receive_timeout(&self) -> Duration {
        Duration::from_secs(self.receive_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let file = write_config(r#"{"token": "abc", "default_namespace": "team-a"}"#);
        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.default_namespace, "team-a");
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config(r#"{"tokne": "abc"}"#);
        let err = ClientConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("cannot read config"));
    }

    #[test]
    fn overrides_win_over_file() {
        let file = write_config(r#"{"token": "file-token", "session_addr": "backend:3000"}"#);
        let config = ClientConfig::resolve(
            Some(file.path()),
            ConfigOverrides {
                token: Some("flag-token".into()),
                debug: true,
                ..ConfigOverrides::default()
            },
        )
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("flag-token"));
        assert_eq!(config.session_addr, "backend:3000");
        assert!(config.debug);
    }

    #[test]
    fn debug_flag_cannot_disable_file_debug() {
        let config = ClientConfig {
            debug: true,
            ..ClientConfig::default()
        }
        .with_overrides(ConfigOverrides::default());
        assert!(config.debug);
    }

    #[test]
    fn invalid_api_url_rejected() {
        let err = ClientConfig::resolve(
            None,
            ConfigOverrides {
                api_url: Some("ws://localhost".into()),
                ..ConfigOverrides::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid api URL"));
    }

    #[test]
    fn session_addr_needs_port() {
        let config = ClientConfig {
            session_addr: "localhost".into(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = ClientConfig {
            receive_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
