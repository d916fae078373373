//! Project-Management API Gateway
//!
//! Validated queries and mutations against a remote, schema-evolving
//! project-management REST API.
//!
//! # Features
//!
//! - **Filter DSL**: where-clause parsing, escaping and normalization
//! - **Entity Validation**: cached type names with single-flight refresh and
//!   a static fallback catalog
//! - **Metadata Reconciliation**: paged type catalog merged with a repaired
//!   secondary feed and built-in system types
//! - **Resilient Execution**: authenticated requests with exponential backoff
//!   that never retries 400 or 401
//!
//! # Example
//!
//! ```no_run
//! use pm_gateway::config::GatewayConfig;
//! use pm_gateway::gateway::{Gateway, SearchRequest};
//!
//! # async fn run() -> pm_gateway::Result<()> {
//! let config = GatewayConfig::load(None)?;
//! let gateway = Gateway::new(&config)?;
//! let open_bugs = gateway
//!     .search_entities(&SearchRequest::new("Bug").filter("EntityState.Name eq 'Open'"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod failsafe;
pub mod gateway;
pub mod metadata;
pub mod query;

pub use error::{Error, ErrorKind, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// # Errors
///
/// Returns [`Error::Config`] if a global subscriber is already installed.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    installed.map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}
