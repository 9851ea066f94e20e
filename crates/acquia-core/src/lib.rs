//! # acquia-core
//!
//! Request construction, authentication and resource projection for the
//! Acquia Cloud API.
//!
//! This crate holds everything a Cloud API client needs that is not tied to a
//! particular endpoint: configuration, URI template expansion, JSON coding,
//! HTTP Basic authentication, a transport seam and the dispatcher that ties
//! them together.
//!
//! ## Modules
//!
//! - [`error`] - Error type and status mapping
//! - [`config`] - Client configuration and defaults
//! - [`uri_template`] - Level-1 and reserved URI template expansion
//! - [`json`] - JSON encoding and decoding
//! - [`auth`] - Credentials and authentication providers
//! - [`request`] - Request and response values
//! - [`transport`] - HTTP transport trait and reqwest implementation
//! - [`dispatcher`] - Builds, authenticates and sends requests
//! - [`resource`] - Typed read-only views over decoded records
//! - [`names`] - Strongly-typed resource names

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod json;
pub mod names;
pub mod request;
pub mod resource;
pub mod transport;
pub mod uri_template;

// Re-export commonly used types
pub use auth::{AuthProvider, BasicAuth, Credentials};
pub use config::CloudApiConfig;
pub use dispatcher::RequestDispatcher;
pub use error::{Error, Result};
pub use json::JsonCodec;
pub use names::{DatabaseName, EnvironmentName, ServerName, SiteName};
pub use request::{Body, Method, Request, Response};
pub use resource::{RawRecord, Resource, ResourceWrapper};
pub use transport::{ReqwestTransport, Transport};
pub use uri_template::{UriTemplate, Variables};
