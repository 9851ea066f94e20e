//! Credential handling.
//!
//! The Cloud API authenticates every call, downloads included, with HTTP
//! Basic credentials. Credentials are fixed for the lifetime of a client.

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use crate::request::Request;

/// Username/password pair.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// The account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password. Callers should avoid logging the returned value.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Applies authentication to outgoing requests.
///
/// Implementations must be stateless across calls so one provider can serve
/// any number of concurrent requests.
#[cfg_attr(test, mockall::automock)]
pub trait AuthProvider: Send + Sync {
    /// Return `request` with credentials applied.
    fn attach(&self, request: Request) -> Request;
}

/// HTTP Basic authentication.
#[derive(Clone, Debug)]
pub struct BasicAuth {
    credentials: Credentials,
}

impl BasicAuth {
    /// Create a provider for `credentials`.
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// The wrapped credentials.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn header_value(&self) -> String {
        let raw = format!(
            "{}:{}",
            self.credentials.username(),
            self.credentials.password()
        );
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(raw)
        )
    }
}

impl AuthProvider for BasicAuth {
    fn attach(&self, request: Request) -> Request {
        request.with_header("Authorization", self.header_value())
    }
}
