//! HTTP transport abstraction.
//!
//! The dispatcher never talks to reqwest directly; it hands a finished
//! [`Request`] to a [`Transport`]. Tests substitute a mock at this seam.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::request::{Request, Response};

/// Default `User-Agent` sent by [`ReqwestTransport`].
pub const USER_AGENT: &str = concat!("acquia-core/", env!("CARGO_PKG_VERSION"));

/// Connect timeout applied to every connection attempt.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Sends a request and returns the raw response.
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status; only failures to obtain a response are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `request` against the absolute `url`.
    async fn send(&self, url: Url, request: Request) -> Result<Response>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Build a transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the underlying client cannot be built.
    pub fn new(timeout: Option<Duration>, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .user_agent(user_agent.unwrap_or(USER_AGENT))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|err| Error::ConfigError(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self { http })
    }

    /// Wrap an existing reqwest client.
    #[must_use]
    pub const fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: Url, request: Request) -> Result<Response> {
        let mut builder = self.http.request(request.method().into(), url);
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        debug!(status, bytes = body.len(), "Cloud API response received");

        let mut response = Response::new(status, body);
        if let Some(content_type) = content_type {
            response = response.with_content_type(content_type);
        }
        Ok(response)
    }
}
