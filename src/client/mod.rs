//! HTTP execution layer for the remote project-management API
//!
//! Every request goes through [`ApiClient::request`] (or
//! [`ApiClient::request_bytes`] for binary content), which attaches the
//! credential, appends `format=json`, and runs the attempt under the
//! configured [`RetryPolicy`](crate::failsafe::RetryPolicy).

mod auth;
mod http;
mod response;

pub use auth::{ACCESS_TOKEN_PARAM, ApiKeyPlacement, AuthConfig};
pub use http::{ApiClient, QueryParams};
pub use response::{ErrorBody, PagedCollection, extract_error_message};
