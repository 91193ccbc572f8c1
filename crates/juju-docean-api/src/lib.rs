//! DigitalOcean provider for juju-docean
//!
//! This crate implements the [`CloudProvider`] trait against the DigitalOcean
//! v1 REST API (query-string `client_id`/`api_key` authentication).
//!
//! # Example
//!
//! ```ignore
//! use juju_docean_api::DigitalOceanClient;
//! use juju_docean_cloud::CloudProvider;
//!
//! let provider = DigitalOceanClient::new("client-id", "api-key")?;
//! let keys = provider.list_ssh_keys().await?;
//! ```
//!
//! [`CloudProvider`]: juju_docean_cloud::CloudProvider

pub mod client;
pub mod error;

pub use client::{DEFAULT_API_BASE, DigitalOceanClient, REQUEST_TIMEOUT};
pub use error::{DigitalOceanError, Result};
