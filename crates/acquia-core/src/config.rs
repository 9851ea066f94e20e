//! Client configuration.
//!
//! A configuration is produced either from builder-style setters or from a
//! string key/value map via [`CloudApiConfig::from_map`], which merges the
//! defaults with the supplied values and then checks the required keys.
//! It is immutable once a client has been built from it.

use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

use crate::auth::Credentials;
use crate::error::{Error, Result};

/// Canonical Cloud API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://cloudapi.acquia.com";

/// API version segment prefixed to every endpoint path.
pub const DEFAULT_BASE_PATH: &str = "/v1";

/// Keys that must be present after defaults have been merged.
pub const REQUIRED_KEYS: [&str; 3] = ["base_url", "username", "password"];

/// Map key for the request timeout, in whole seconds.
pub const TIMEOUT_KEY: &str = "timeout";

/// Map key for the `User-Agent` override.
pub const USER_AGENT_KEY: &str = "user_agent";

/// Configuration for a Cloud API client instance.
#[derive(Clone, Validate)]
pub struct CloudApiConfig {
    /// Scheme and host of the API (e.g. `https://cloudapi.acquia.com`)
    #[validate(url)]
    pub base_url: String,

    /// Versioned path prefix (e.g. `/v1`)
    #[validate(custom(function = "validate_base_path"))]
    pub base_path: String,

    /// Account name used for HTTP Basic authentication
    #[validate(length(min = 1))]
    pub username: String,

    password: SecretString,

    /// Request timeout in seconds; `None` keeps the transport default
    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: Option<u64>,

    /// Optional `User-Agent` override
    pub user_agent: Option<String>,
}

fn validate_base_path(base_path: &str) -> std::result::Result<(), ValidationError> {
    if base_path.is_empty() || base_path.starts_with('/') {
        Ok(())
    } else {
        Err(ValidationError::new("base_path_must_start_with_slash"))
    }
}

impl CloudApiConfig {
    /// Create a configuration with the default endpoint and base path.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (for example an empty username).
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let config = Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            username: username.into(),
            password: SecretString::from(password.into()),
            timeout_secs: None,
            user_agent: None,
        };

        config.validate_config()?;
        Ok(config)
    }

    /// Build a configuration from a key/value map.
    ///
    /// Defaults are applied first, supplied values override them, then every
    /// key in [`REQUIRED_KEYS`] must be present. All missing keys are reported
    /// together. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] naming the missing keys, or
    /// [`Error::ConfigError`] when a value is malformed.
    pub fn from_map<I, K, V>(supplied: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged = Self::defaults();
        merged.extend(
            supplied
                .into_iter()
                .map(|(key, value)| (key.into(), value.into())),
        );

        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| !merged.contains_key(**key))
            .map(|key| (*key).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingConfig { keys: missing });
        }

        let timeout_secs = merged
            .get(TIMEOUT_KEY)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|err| {
                    Error::ConfigError(format!("Invalid `{TIMEOUT_KEY}` value `{raw}`: {err}"))
                })
            })
            .transpose()?;

        let user_agent = merged.remove(USER_AGENT_KEY);
        let mut take = |key: &str| merged.remove(key).unwrap_or_default();
        let config = Self {
            base_url: take("base_url"),
            base_path: take("base_path"),
            username: take("username"),
            password: SecretString::from(take("password")),
            timeout_secs,
            user_agent,
        };

        config.validate_config()?;
        Ok(config)
    }

    /// The default key/value pairs merged under every supplied map.
    #[must_use]
    pub fn defaults() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("base_url".to_string(), DEFAULT_BASE_URL.to_string()),
            ("base_path".to_string(), DEFAULT_BASE_PATH.to_string()),
        ])
    }

    /// Override the API endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the versioned base path.
    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    /// Set a request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = Some(seconds);
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Run field validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing every failing field.
    pub fn validate_config(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))
    }

    /// The password.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Credentials for the auth provider.
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.expose_secret())
    }

    /// Get the request timeout as a Duration, if set.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Parse and validate the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn parse_base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url)
            .map_err(|e| Error::ConfigError(format!("Invalid base URL: {e}")))
    }
}

impl fmt::Debug for CloudApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudApiConfig")
            .field("base_url", &self.base_url)
            .field("base_path", &self.base_path)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_applies_defaults() {
        let config = CloudApiConfig::new("user", "pass").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.base_path, "/v1");
        assert_eq!(config.username, "user");
        assert_eq!(config.password(), "pass");
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_from_map_merges_defaults() {
        let config = CloudApiConfig::from_map([("username", "user"), ("password", "pass")]).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.base_path, DEFAULT_BASE_PATH);
    }

    #[test]
    fn test_from_map_supplied_values_override_defaults() {
        let config = CloudApiConfig::from_map([
            ("base_url", "http://localhost:8080"),
            ("base_path", "/v2"),
            ("username", "user"),
            ("password", "pass"),
            ("timeout", "45"),
            ("user_agent", "provisioner/1.0"),
            ("unrelated", "ignored"),
        ])
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.base_path, "/v2");
        assert_eq!(config.timeout(), Some(Duration::from_secs(45)));
        assert_eq!(config.user_agent.as_deref(), Some("provisioner/1.0"));
    }

    #[test]
    fn test_from_map_missing_password_is_named() {
        let err = CloudApiConfig::from_map([("username", "user")]).unwrap_err();
        assert_eq!(
            err,
            Error::MissingConfig {
                keys: vec!["password".to_string()]
            }
        );
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_from_map_reports_all_missing_keys() {
        let err = CloudApiConfig::from_map(Vec::<(String, String)>::new()).unwrap_err();
        assert_eq!(
            err,
            Error::MissingConfig {
                keys: vec!["username".to_string(), "password".to_string()]
            }
        );
    }

    #[test]
    fn test_from_map_rejects_malformed_values() {
        let err = CloudApiConfig::from_map([
            ("base_url", "not a url"),
            ("username", "user"),
            ("password", "pass"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let err = CloudApiConfig::from_map([
            ("username", "user"),
            ("password", "pass"),
            ("timeout", "soon"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let err = CloudApiConfig::from_map([
            ("base_path", "v1"),
            ("username", "user"),
            ("password", "pass"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_empty_username_is_invalid() {
        let err = CloudApiConfig::new("", "pass").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_timeout_range() {
        let mut config = CloudApiConfig::new("user", "pass").unwrap();
        config.timeout_secs = Some(0);
        assert!(config.validate_config().is_err());

        config.timeout_secs = Some(301);
        assert!(config.validate_config().is_err());

        config = config.with_timeout(30);
        assert!(config.validate_config().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = CloudApiConfig::new("user", "pass")
            .unwrap()
            .with_base_url("http://127.0.0.1:9000")
            .with_base_path("/v1")
            .with_user_agent("agent/2");

        let url = config.parse_base_url().unwrap();
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.port(), Some(9000));
        assert_eq!(config.user_agent.as_deref(), Some("agent/2"));
    }

    #[test]
    fn test_credentials_from_config() {
        let config = CloudApiConfig::new("user", "pass").unwrap();
        let creds = config.credentials();
        assert_eq!(creds.username(), "user");
        assert_eq!(creds.password(), "pass");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = CloudApiConfig::new("user", "hunter2").unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("hunter2"));
    }
}
