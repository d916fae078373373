//! Request authentication
//!
//! # Security
//!
//! The credential is never logged: `Debug` output redacts it, and error
//! messages built from headers never include it.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::config::AuthMode;

/// Query parameter carrying the access token in query placement
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Where an API key is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyPlacement {
    /// `?access_token=<token>`
    #[default]
    Query,
    /// `Authorization: Bearer <token>`
    Header,
}

/// Immutable credential attached to every request
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    mode: AuthMode,
    token: String,
    placement: ApiKeyPlacement,
}

impl AuthConfig {
    /// Basic auth from a username and password
    #[must_use]
    pub fn basic(username: &str, password: &str) -> Self {
        Self {
            mode: AuthMode::Basic,
            token: STANDARD.encode(format!("{username}:{password}")),
            placement: ApiKeyPlacement::default(),
        }
    }

    /// Basic auth from an already encoded `base64(username:password)` token
    #[must_use]
    pub fn basic_token(token: impl Into<String>) -> Self {
        Self {
            mode: AuthMode::Basic,
            token: token.into(),
            placement: ApiKeyPlacement::default(),
        }
    }

    /// API-key auth
    #[must_use]
    pub fn api_key(token: impl Into<String>, placement: ApiKeyPlacement) -> Self {
        Self {
            mode: AuthMode::ApiKey,
            token: token.into(),
            placement,
        }
    }

    /// Authentication mode
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Raw token
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Attach the credential to a request
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match (self.mode, self.placement) {
            (AuthMode::Basic, _) => request.header(AUTHORIZATION, format!("Basic {}", self.token)),
            (AuthMode::ApiKey, ApiKeyPlacement::Header) => {
                request.header(AUTHORIZATION, format!("Bearer {}", self.token))
            }
            (AuthMode::ApiKey, ApiKeyPlacement::Query) => {
                request.query(&[(ACCESS_TOKEN_PARAM, self.token.as_str())])
            }
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("mode", &self.mode)
            .field("token", &"<redacted>")
            .field("placement", &self.placement)
            .finish()
    }
}
