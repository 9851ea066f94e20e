//! Acquia Cloud API client.
//!
//! This crate exposes the resource models and an asynchronous HTTP client for
//! the Cloud API v1: sites, environments, servers, databases and backups,
//! SSH keys and SVN users.
//!
//! ```no_run
//! use acquia_cloudapi::{CloudApiClient, SiteName};
//!
//! # async fn run() -> acquia_cloudapi::Result<()> {
//! let client = CloudApiClient::from_map([("username", "me"), ("password", "secret")])?;
//! for site in client.sites().await? {
//!     let record = client.site(&site).await?;
//!     println!("{} ({})", record, record.hosting_stage()?);
//! }
//! # let _ = SiteName::from("devcloud:example");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod models;
pub mod paths;

pub use acquia_core::names::{DatabaseName, EnvironmentName, ServerName, SiteName};
pub use acquia_core::{Error, RawRecord, Resource};
pub use client::{CloudApiClient, CloudApiClientBuilder};
pub use models::{
    Database, DatabaseBackup, Environment, InstallType, MaxPhpProcsRequest, Server, Site, SshKey,
    SshKeyRequest, SvnUser, SvnUserRequest, Task, VcsType,
};

/// Convenient result alias matching the shared Cloud API error type.
pub type Result<T> = acquia_core::Result<T>;
