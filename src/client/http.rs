//! Authenticated REST client with retry

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::auth::AuthConfig;
use super::response::extract_error_message;
use crate::config::GatewayConfig;
use crate::failsafe::{RetryPolicy, with_retry};
use crate::{Error, Result};

/// Query parameters as name/value pairs
pub type QueryParams<'a> = [(&'a str, String)];

/// HTTP execution client for the remote API
pub struct ApiClient {
    http: Client,
    base_url: String,
    auth: AuthConfig,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a client
    pub fn new(
        base_url: impl Into<String>,
        auth: AuthConfig,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pm-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            retry,
        })
    }

    /// Create a client from configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::new(
            config.api.resolve_base_url()?,
            config.auth.resolve()?,
            RetryPolicy::new(&config.retry),
            config.api.timeout,
        )
    }

    /// Base URL endpoints are relative to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint into a full URL. Absolute URLs pass through.
    #[must_use]
    pub fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
        }
    }

    /// Whether `url` shares scheme, host and port with the base URL.
    /// Credentials are only attached to same-origin requests.
    pub(crate) fn is_same_origin(&self, url: &str) -> bool {
        match (Url::parse(url), Url::parse(&self.base_url)) {
            (Ok(target), Ok(base)) => target.origin() == base.origin(),
            _ => false,
        }
    }

    /// Send a request and decode the JSON response, retrying per policy
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        query: &QueryParams<'_>,
    ) -> Result<Value> {
        let operation = format!("{method} {endpoint}");
        let url = self.build_url(endpoint);
        let url = url.as_str();

        with_retry(&self.retry, &operation, || {
            let method = method.clone();
            async move {
                let response = self.send_once(method, url, body, query).await?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| Error::Transport(format!("Failed to read response: {e}")))?;
                if bytes.iter().all(u8::is_ascii_whitespace) {
                    return Ok(Value::Null);
                }
                Ok(serde_json::from_slice(&bytes)?)
            }
        })
        .await
    }

    /// GET and decode into a typed envelope
    pub async fn get_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &QueryParams<'_>,
    ) -> Result<T> {
        let value = self.request(Method::GET, endpoint, None, query).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// GET returning raw JSON
    pub async fn get(&self, endpoint: &str, query: &QueryParams<'_>) -> Result<Value> {
        self.request(Method::GET, endpoint, None, query).await
    }

    /// POST a JSON body
    pub async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.request(Method::POST, endpoint, Some(body), &[]).await
    }

    /// DELETE a resource
    pub async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.request(Method::DELETE, endpoint, None, &[]).await
    }

    /// GET raw bytes (attachment content, unparsed metadata feeds), retrying per policy
    pub async fn request_bytes(&self, endpoint: &str, query: &QueryParams<'_>) -> Result<Bytes> {
        let operation = format!("GET {endpoint}");
        let url = self.build_url(endpoint);
        let url = url.as_str();

        with_retry(&self.retry, &operation, || async move {
            let response = self.send_once(Method::GET, url, None, query).await?;
            response
                .bytes()
                .await
                .map_err(|e| Error::Transport(format!("Failed to read response: {e}")))
        })
        .await
    }

    /// One attempt: build, authenticate, send and classify the status
    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        query: &QueryParams<'_>,
    ) -> Result<Response> {
        let mut request = self
            .http
            .request(method, url)
            .query(query)
            .query(&[("format", "json")]);
        if self.is_same_origin(url) {
            request = self.auth.apply(request);
        } else {
            debug!(%url, "Foreign origin, sending request without credentials");
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_text = status.canonical_reason().unwrap_or("Unknown error").to_string();
        let body = response.bytes().await.unwrap_or_default();
        let message = extract_error_message(&body, &status_text);
        debug!(status = status.as_u16(), %message, "Remote API returned an error");
        Err(Error::api(status.as_u16(), message))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
