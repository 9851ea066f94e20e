//! Error types for Cloud API operations.
//!
//! Every failure a caller can observe is a variant of [`Error`]. Errors are
//! per-call: a client that returned an error remains usable afterwards.

use thiserror::Error;

/// Main error type for Cloud API operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// One or more required configuration keys were not supplied
    #[error("Missing required configuration key(s): {}", .keys.join(", "))]
    MissingConfig {
        /// Names of the missing keys, in declaration order
        keys: Vec<String>,
    },

    /// Configuration value present but malformed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed URI template
    #[error("Invalid URI template: {0}")]
    TemplateSyntax(String),

    /// A template placeholder had no value in the variable mapping
    #[error("Undefined template variable: {0}")]
    UndefinedVariable(String),

    /// A body that should have been JSON could not be decoded
    #[error("Failed to decode response: {0}")]
    DecodeError(String),

    /// An outgoing value could not be serialized as JSON
    #[error("Failed to encode JSON: {0}")]
    EncodeError(String),

    /// The server answered with a 4xx/5xx status, or the request never
    /// produced a response at all (`status` is `None`)
    #[error("Cloud API request failed ({}): {message}", status_label(.status))]
    ClientError {
        /// HTTP status code, when a response was received
        status: Option<u16>,
        /// Human-readable summary
        message: String,
        /// Decoded error payload, when the server sent one
        body: Option<serde_json::Value>,
    },

    /// The transport gave up waiting for a response
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A resource accessor asked for a field the record does not carry
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A resource field is present but has an unexpected type or value
    #[error("Invalid field `{field}`: expected {expected}")]
    InvalidField {
        /// Field name
        field: String,
        /// Description of the expected shape
        expected: String,
    },

    /// A request URL could not be assembled
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Local I/O failure (configuration dumps)
    #[error("I/O error: {0}")]
    Io(String),
}

#[allow(clippy::ref_option)]
fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "no response".to_string(), |code| format!("HTTP {code}"))
}

/// Specialized result type for Cloud API operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingConfig { .. } => "MISSING_CONFIG",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::TemplateSyntax(_) => "TEMPLATE_SYNTAX",
            Self::UndefinedVariable(_) => "UNDEFINED_VARIABLE",
            Self::DecodeError(_) => "DECODE_ERROR",
            Self::EncodeError(_) => "ENCODE_ERROR",
            Self::ClientError { .. } => "CLIENT_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::Io(_) => "IO_ERROR",
        }
    }

    /// HTTP status carried by a [`Error::ClientError`], if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::ClientError { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns true for configuration errors raised at client construction.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::MissingConfig { .. } | Self::ConfigError(_))
    }

    /// Returns true for template errors, which are always programming mistakes.
    #[must_use]
    pub const fn is_template_error(&self) -> bool {
        matches!(self, Self::TemplateSyntax(_) | Self::UndefinedVariable(_))
    }

    /// Shorthand for [`Error::MissingField`].
    #[must_use]
    pub fn missing_field(field: &str) -> Self {
        Self::MissingField(field.to_string())
    }

    /// Shorthand for [`Error::InvalidField`].
    #[must_use]
    pub fn invalid_field(field: &str, expected: &str) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            expected: expected.to_string(),
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::DecodeError(err.to_string())
        } else {
            Self::ClientError {
                status: err.status().map(|status| status.as_u16()),
                message: err.to_string(),
                body: None,
            }
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::DecodeError(err.to_string())
    }
}

impl Error {
    /// Wrap a serialization failure for an outgoing value.
    pub(crate) fn encode(err: &serde_json::Error) -> Self {
        Self::EncodeError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
