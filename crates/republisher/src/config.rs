//! Run configuration
//!
//! Built once at startup (defaults, then an optional TOML file, then environment
//! overrides, then CLI flags), validated, and only ever borrowed afterwards.
//! The binary does the layering; this module provides each step.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::dispatch::DispatchMode;
use crate::error::{RepublishError, Result};
use crate::identifier::MalformedRowPolicy;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Rows sent per request when not configured.
pub const DEFAULT_ITEMS_PER_BATCH: usize = 10;

/// Per-request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MILLIS: u64 = 3000;

/// API base URL for local development.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Resource path of the batch endpoint.
pub const DEFAULT_BATCH_PATH: &str = "/republish";

/// Resource path of the single-item endpoint.
pub const DEFAULT_SINGLE_PATH: &str = "/republish";

/// Header carrying the fixed API token.
pub const DEFAULT_AUTH_HEADER: &str = "X-Auth-Token";

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepublishConfig {
    /// Window size: rows per request
    pub items_per_batch: usize,

    /// Log every accepted identifier
    pub log_success: bool,

    /// Log failed windows
    pub log_errors: bool,

    /// Log the cursor before each window
    pub log_progress: bool,

    pub malformed_rows: MalformedRowPolicy,

    /// Also write rows the API never answered for to the error sink
    pub sink_unaccounted: bool,

    pub mode: DispatchMode,

    pub client: ClientConfig,
}

impl Default for RepublishConfig {
    fn default() -> Self {
        Self {
            items_per_batch: DEFAULT_ITEMS_PER_BATCH,
            log_success: true,
            log_errors: true,
            log_progress: false,
            malformed_rows: MalformedRowPolicy::default(),
            sink_unaccounted: false,
            mode: DispatchMode::default(),
            client: ClientConfig::default(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub batch_path: String,
    pub single_path: String,
    pub request_timeout_millis: u64,
    pub auth_header: String,
    pub auth_token: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            batch_path: DEFAULT_BATCH_PATH.to_string(),
            single_path: DEFAULT_SINGLE_PATH.to_string(),
            request_timeout_millis: DEFAULT_REQUEST_TIMEOUT_MILLIS,
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            auth_token: String::new(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_millis)
    }
}

impl RepublishConfig {
    /// Parse a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RepublishError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| RepublishError::config(format!("invalid TOML: {}", e)))
    }

    /// Apply environment overrides
    ///
    /// Environment variables:
    /// - `REPUBLISH_ITEMS_PER_BATCH`
    /// - `REPUBLISH_LOG_SUCCESS`, `REPUBLISH_LOG_ERRORS`, `REPUBLISH_LOG_PROGRESS`
    /// - `REPUBLISH_API_URL`
    /// - `REPUBLISH_TIMEOUT_MS`
    /// - `REPUBLISH_AUTH_TOKEN`
    pub fn merge_env(mut self) -> Result<Self> {
        if let Some(items) = env_override("REPUBLISH_ITEMS_PER_BATCH")? {
            self.items_per_batch = items;
        }
        if let Some(flag) = env_override("REPUBLISH_LOG_SUCCESS")? {
            self.log_success = flag;
        }
        if let Some(flag) = env_override("REPUBLISH_LOG_ERRORS")? {
            self.log_errors = flag;
        }
        if let Some(flag) = env_override("REPUBLISH_LOG_PROGRESS")? {
            self.log_progress = flag;
        }
        if let Ok(url) = std::env::var("REPUBLISH_API_URL") {
            self.client.api_base_url = url;
        }
        if let Some(millis) = env_override("REPUBLISH_TIMEOUT_MS")? {
            self.client.request_timeout_millis = millis;
        }
        if let Ok(token) = std::env::var("REPUBLISH_AUTH_TOKEN") {
            self.client.auth_token = token;
        }

        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.items_per_batch == 0 {
            return Err(RepublishError::config("items_per_batch must be greater than 0"));
        }

        if self.client.request_timeout_millis == 0 {
            return Err(RepublishError::config(
                "request_timeout_millis must be greater than 0",
            ));
        }

        if self.client.api_base_url.trim().is_empty() {
            return Err(RepublishError::config("api_base_url cannot be empty"));
        }

        let base = Url::parse(&self.client.api_base_url).map_err(|e| {
            RepublishError::config(format!(
                "api_base_url '{}' is not a valid URL: {}",
                self.client.api_base_url, e
            ))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RepublishError::config(format!(
                "api_base_url must be http or https, got '{}'",
                base.scheme()
            )));
        }

        if self.client.auth_header.trim().is_empty() {
            return Err(RepublishError::config("auth_header cannot be empty"));
        }

        if self.client.auth_token.is_empty() {
            tracing::warn!(header = %self.client.auth_header, "No API token configured - requests will carry an empty token");
        }

        Ok(())
    }
}

fn env_override<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| RepublishError::config(format!("{}='{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RepublishConfig::default();
        assert_eq!(config.items_per_batch, 10);
        assert!(config.log_success);
        assert!(config.log_errors);
        assert!(!config.log_progress);
        assert_eq!(config.malformed_rows, MalformedRowPolicy::AbortBatch);
        assert_eq!(config.mode, DispatchMode::Multi);
        assert_eq!(config.client.request_timeout(), Duration::from_millis(3000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RepublishConfig::from_toml_str(
            r#"
            items_per_batch = 2
            malformed_rows = "skip-row"
            mode = "single"

            [client]
            api_base_url = "https://api.example.com"
            auth_token = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.items_per_batch, 2);
        assert_eq!(config.malformed_rows, MalformedRowPolicy::SkipRow);
        assert_eq!(config.mode, DispatchMode::Single);
        assert_eq!(config.client.api_base_url, "https://api.example.com");
        assert_eq!(config.client.batch_path, DEFAULT_BATCH_PATH);
        assert!(config.log_errors);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = RepublishConfig::from_toml_str("goroutines = 4").unwrap_err();
        assert!(matches!(err, RepublishError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = RepublishConfig {
            items_per_batch: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RepublishError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        for url in ["", "not a url", "ftp://example.com"] {
            let mut config = RepublishConfig::default();
            config.client.api_base_url = url.to_string();
            assert!(config.validate().is_err(), "accepted {:?}", url);
        }
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = RepublishConfig::default();
        config.client.request_timeout_millis = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("REPUBLISH_ITEMS_PER_BATCH", "25");
        std::env::set_var("REPUBLISH_LOG_PROGRESS", "true");
        std::env::set_var("REPUBLISH_API_URL", "http://republish.internal");

        let config = RepublishConfig::default().merge_env().unwrap();
        assert_eq!(config.items_per_batch, 25);
        assert!(config.log_progress);
        assert_eq!(config.client.api_base_url, "http://republish.internal");

        std::env::remove_var("REPUBLISH_ITEMS_PER_BATCH");
        std::env::remove_var("REPUBLISH_LOG_PROGRESS");
        std::env::remove_var("REPUBLISH_API_URL");
    }

    #[test]
    #[serial]
    fn test_env_override_parse_failure() {
        std::env::set_var("REPUBLISH_TIMEOUT_MS", "soon");
        let err = RepublishConfig::default().merge_env().unwrap_err();
        assert!(err.to_string().contains("REPUBLISH_TIMEOUT_MS"));
        std::env::remove_var("REPUBLISH_TIMEOUT_MS");
    }

    #[test]
    #[serial]
    fn test_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "items_per_batch = 3\nlog_success = false").unwrap();

        let config = RepublishConfig::from_file(file.path())
            .and_then(RepublishConfig::merge_env)
            .unwrap();
        assert_eq!(config.items_per_batch, 3);
        assert!(!config.log_success);
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let raw = include_str!("../../../republish.example.toml");
        let config = RepublishConfig::from_toml_str(raw).unwrap();
        assert_eq!(config, RepublishConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let err = RepublishConfig::from_file(Path::new("/no/such/republish.toml")).unwrap_err();
        assert!(matches!(err, RepublishError::Configuration(_)));
    }
}
