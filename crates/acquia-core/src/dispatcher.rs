//! Request dispatch.
//!
//! [`RequestDispatcher::call`] is the only place network I/O happens: it
//! expands the path template, encodes the body, applies authentication,
//! sends the request and decodes the answer. There is no retry, caching or
//! request coalescing; every failure surfaces to the caller immediately.

use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::auth::AuthProvider;
use crate::error::{Error, Result};
use crate::json::JsonCodec;
use crate::request::{Body, Method, Request, Response};
use crate::transport::Transport;
use crate::uri_template::{UriTemplate, Variables};

/// Default `Content-Type` header for every request.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Template variable that carries the versioned base path.
pub const BASE_PATH_VAR: &str = "base_path";

/// Expands, authenticates and sends requests.
///
/// Cloning is cheap; clones share the auth provider and transport.
#[derive(Clone)]
pub struct RequestDispatcher {
    base_url: Url,
    base_path: String,
    auth: Arc<dyn AuthProvider>,
    transport: Arc<dyn Transport>,
    default_headers: Arc<Vec<(String, String)>>,
}

impl RequestDispatcher {
    /// Create a dispatcher bound to `base_url` and `base_path`.
    #[must_use]
    pub fn new(
        base_url: Url,
        base_path: impl Into<String>,
        auth: Arc<dyn AuthProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url,
            base_path: base_path.into(),
            auth,
            transport,
            default_headers: Arc::new(vec![
                ("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ]),
        }
    }

    /// Add or replace a header sent with every request.
    #[must_use]
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let headers = Arc::make_mut(&mut self.default_headers);
        headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        headers.push((name, value.into()));
        self
    }

    /// The API endpoint.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The versioned base path substituted for `{+base_path}`.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Headers sent with every request.
    #[must_use]
    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }

    /// Build the authenticated request for a call without sending it.
    ///
    /// `{+base_path}` is always bound to the dispatcher's base path. A body
    /// passed with [`Method::Get`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns template errors from expansion and encoding errors from the body.
    pub fn build_request(
        &self,
        method: Method,
        template: &str,
        vars: &Variables,
        body: Option<Body>,
    ) -> Result<Request> {
        let template = UriTemplate::parse(template)?;
        let vars = vars.clone().with(BASE_PATH_VAR, &self.base_path);
        let path = template.expand(&vars)?;

        let mut request = Request::new(method, path);
        for (name, value) in self.default_headers.iter() {
            request = request.with_header(name.as_str(), value.as_str());
        }

        match body {
            Some(body) if method.allows_body() => {
                request = request.with_body(body.encode()?);
            }
            Some(_) => {
                debug!(path = request.path(), "Dropping body on GET request");
            }
            None => {}
        }

        Ok(self.auth.attach(request))
    }

    /// Issue a call and decode the JSON response.
    ///
    /// A `204 No Content` answer decodes to [`Value::Null`].
    ///
    /// # Errors
    ///
    /// - template errors if `template`/`vars` do not line up
    /// - [`Error::ClientError`] for 4xx/5xx statuses or transport failures
    /// - [`Error::DecodeError`] if a successful body is not valid JSON
    pub async fn call(
        &self,
        method: Method,
        template: &str,
        vars: &Variables,
        body: Option<Body>,
    ) -> Result<Value> {
        let response = self.execute(method, template, vars, body).await?;
        if response.status() == StatusCode::NO_CONTENT.as_u16() {
            return Ok(Value::Null);
        }
        JsonCodec::decode(response.body())
    }

    /// Issue a call and decode the response into `T`.
    ///
    /// A `204 No Content` answer is decoded as JSON `null`, so it succeeds
    /// for `Option<_>` and `()` targets.
    ///
    /// # Errors
    ///
    /// See [`RequestDispatcher::call`].
    pub async fn call_as<T>(
        &self,
        method: Method,
        template: &str,
        vars: &Variables,
        body: Option<Body>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(method, template, vars, body).await?;
        if response.status() == StatusCode::NO_CONTENT.as_u16() {
            return T::deserialize(Value::Null).map_err(Error::from);
        }
        JsonCodec::decode_as(response.body())
    }

    /// Issue an authenticated GET and return the body without decoding it.
    ///
    /// # Errors
    ///
    /// Returns template errors or [`Error::ClientError`].
    pub async fn download(&self, template: &str, vars: &Variables) -> Result<Bytes> {
        let response = self.execute(Method::Get, template, vars, None).await?;
        Ok(response.into_body())
    }

    async fn execute(
        &self,
        method: Method,
        template: &str,
        vars: &Variables,
        body: Option<Body>,
    ) -> Result<Response> {
        let request = self.build_request(method, template, vars, body)?;
        let url = self.url_for(request.path())?;

        info!(method = %method, path = request.path(), "Cloud API request");

        let response = self.transport.send(url, request).await?;
        if response.is_success() {
            return Ok(response);
        }

        Err(status_to_error(&response))
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid request URL `{joined}`: {err}")))
    }
}

fn status_to_error(response: &Response) -> Error {
    let status = response.status();
    let raw = response.body();

    let body = if raw.is_empty() {
        None
    } else {
        Some(JsonCodec::decode(raw).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(raw).into_owned())
        }))
    };

    let message = body
        .as_ref()
        .and_then(|value| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|code| code.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Unexpected response status".to_string());

    debug!(status, %message, "Cloud API error response");

    Error::ClientError {
        status: Some(status),
        message,
        body,
    }
}
