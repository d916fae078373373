//! Configuration management

use std::{env, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::{ApiKeyPlacement, AuthConfig};
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Environment files to load before resolving `env:` references.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Remote API location
    pub api: ApiConfig,
    /// Credentials
    pub auth: AuthSettings,
    /// Retry policy for remote calls
    pub retry: RetryConfig,
    /// Entity type cache
    pub cache: CacheConfig,
    /// Metadata reconciliation
    pub metadata: MetadataConfig,
}

/// Remote API location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Account domain, e.g. `acme.tpondemand.com`
    pub domain: Option<String>,
    /// Full base URL; overrides `domain` when set
    pub base_url: Option<String>,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            domain: None,
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Resolve the base URL all endpoints are relative to
    pub fn resolve_base_url(&self) -> Result<String> {
        let base = if let Some(base) = self.base_url.as_deref().filter(|b| !b.trim().is_empty()) {
            base.trim().trim_end_matches('/').to_string()
        } else {
            match self.domain.as_deref().map(str::trim) {
                Some(domain) if !domain.is_empty() => {
                    format!("https://{}/api/v1", domain.trim_end_matches('/'))
                }
                _ => {
                    return Err(Error::Config(
                        "Either api.domain or api.base_url must be set".to_string(),
                    ));
                }
            }
        };

        let parsed = Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid API base URL '{base}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "API base URL must use http or https, got '{base}'"
            )));
        }
        Ok(base)
    }
}

/// Authentication mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// HTTP Basic with username and password
    #[default]
    Basic,
    /// Access token
    ApiKey,
}

/// Credential settings as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    /// Authentication mode
    pub mode: AuthMode,
    /// Username for basic auth (supports `env:VAR_NAME`)
    pub username: Option<String>,
    /// Password for basic auth (supports `env:VAR_NAME`)
    pub password: Option<String>,
    /// Access token for api-key auth (supports `env:VAR_NAME`)
    pub api_key: Option<String>,
    /// Where the access token goes
    pub api_key_placement: ApiKeyPlacement,
}

impl AuthSettings {
    /// Resolve into the immutable runtime credential
    pub fn resolve(&self) -> Result<AuthConfig> {
        match self.mode {
            AuthMode::Basic => {
                let username = self.username.as_deref().map(resolve_secret);
                let password = self.password.as_deref().map(resolve_secret);
                match (username, password) {
                    (Some(u), Some(p)) if !u.is_empty() => Ok(AuthConfig::basic(&u, &p)),
                    _ => Err(Error::Config(
                        "Basic auth requires auth.username and auth.password".to_string(),
                    )),
                }
            }
            AuthMode::ApiKey => match self.api_key.as_deref().map(resolve_secret) {
                Some(key) if !key.is_empty() => {
                    Ok(AuthConfig::api_key(key, self.api_key_placement))
                }
                _ => Err(Error::Config("API key auth requires auth.api_key".to_string())),
            },
        }
    }
}

/// Expand an `env:VAR_NAME` reference, falling back to the literal
fn resolve_secret(value: &str) -> String {
    if let Some(var_name) = value.strip_prefix("env:") {
        env::var(var_name).unwrap_or_else(|_| value.to_string())
    } else {
        value.to_string()
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    pub max_retries: u32,
    /// Delay before the second attempt
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after every failed attempt
    pub backoff_factor: f32,
    /// Upper bound on any single delay
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Entity type cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a fetched set of valid type names stays fresh
    #[serde(with = "humantime_serde")]
    pub type_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            type_ttl: Duration::from_secs(3600),
        }
    }
}

/// Metadata reconciliation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Page size for the primary type catalog
    pub page_size: usize,
    /// Hard stop for catalog paging
    pub max_pages: usize,
    /// Whether to consult the secondary `meta` feed at all
    pub use_secondary: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 50,
            use_secondary: true,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // PM_GATEWAY_AUTH__API_KEY -> auth.api_key
        figment = figment.merge(Env::prefixed("PM_GATEWAY_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.load_env_files();
        config.validate()?;

        Ok(config)
    }

    /// Check invariants the rest of the crate relies on
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_retries < 1 {
            return Err(Error::Config("retry.max_retries must be at least 1".to_string()));
        }
        if self.retry.backoff_factor <= 1.0 {
            return Err(Error::Config(
                "retry.backoff_factor must be greater than 1".to_string(),
            ));
        }
        if self.metadata.page_size == 0 || self.metadata.max_pages == 0 {
            return Err(Error::Config(
                "metadata.page_size and metadata.max_pages must be positive".to_string(),
            ));
        }
        self.api.resolve_base_url()?;
        self.auth.resolve()?;
        Ok(())
    }

    /// Load environment files into the process environment.
    /// Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                    Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }
    }
}

/// Serde helpers for human-readable durations (`"30s"`, `"5m"`, `"1h"`, `"100ms"`)
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to a human-readable string
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    /// Deserialize a human-readable duration string
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    /// Parse `"100ms"`, `"30s"`, `"5m"`, `"1h"` or bare seconds
    pub fn parse(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let (number, unit_secs) = if let Some(ms) = s.strip_suffix("ms") {
            let ms = ms.trim().parse::<u64>().map_err(|e| format!("{s:?}: {e}"))?;
            return Ok(Duration::from_millis(ms));
        } else if let Some(hours) = s.strip_suffix('h') {
            (hours, 3600)
        } else if let Some(mins) = s.strip_suffix('m') {
            (mins, 60)
        } else if let Some(secs) = s.strip_suffix('s') {
            (secs, 1)
        } else {
            (s, 1)
        };

        let value = number.trim().parse::<u64>().map_err(|e| format!("{s:?}: {e}"))?;
        value
            .checked_mul(unit_secs)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("{s:?}: duration too large"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.cache.type_ttl, Duration::from_secs(3600));
        assert_eq!(config.metadata.page_size, 100);
        assert_eq!(config.auth.mode, AuthMode::Basic);
    }

    #[test]
    fn test_base_url_from_domain() {
        let api = ApiConfig {
            domain: Some("acme.tpondemand.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            api.resolve_base_url().unwrap(),
            "https://acme.tpondemand.com/api/v1"
        );
    }

    #[test]
    fn test_base_url_override_wins() {
        let api = ApiConfig {
            domain: Some("acme.tpondemand.com".to_string()),
            base_url: Some("http://127.0.0.1:9000/api/v1/".to_string()),
            ..Default::default()
        };
        assert_eq!(api.resolve_base_url().unwrap(), "http://127.0.0.1:9000/api/v1");
    }

    #[test]
    fn test_malformed_base_url_is_config_error() {
        for base in ["not a url", "ftp://files.example.com/api/v1"] {
            let api = ApiConfig {
                base_url: Some(base.to_string()),
                ..Default::default()
            };
            assert!(matches!(api.resolve_base_url(), Err(Error::Config(_))), "{base}");
        }
    }

    #[test]
    fn test_missing_location_is_config_error() {
        let err = ApiConfig::default().resolve_base_url().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(humantime_serde::parse("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(humantime_serde::parse("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(humantime_serde::parse("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(humantime_serde::parse("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(humantime_serde::parse("7").unwrap(), Duration::from_secs(7));
        assert!(humantime_serde::parse("soon").is_err());
    }

    #[test]
    fn test_duration_overflow_is_error() {
        let err = humantime_serde::parse("18446744073709551615h").unwrap_err();
        assert!(err.contains("too large"));
        assert!(humantime_serde::parse("18446744073709551615m").is_err());
        assert_eq!(
            humantime_serde::parse("18446744073709551615s").unwrap(),
            Duration::from_secs(u64::MAX)
        );
    }

    #[test]
    fn test_validate_rejects_bad_retry() {
        let mut config = GatewayConfig {
            api: ApiConfig {
                domain: Some("acme.example.com".to_string()),
                ..Default::default()
            },
            auth: AuthSettings {
                username: Some("admin".to_string()),
                password: Some("secret".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.retry.backoff_factor = 1.0;
        assert!(config.validate().is_err());

        config.retry.backoff_factor = 2.0;
        config.retry.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = GatewayConfig {
            api: ApiConfig {
                domain: Some("acme.example.com".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_basic_auth_resolution() {
        let settings = AuthSettings {
            mode: AuthMode::Basic,
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };
        let auth = settings.resolve().unwrap();
        // base64("admin:secret")
        assert_eq!(auth.token(), "YWRtaW46c2VjcmV0");
    }

    #[test]
    fn test_api_key_requires_key() {
        let settings = AuthSettings {
            mode: AuthMode::ApiKey,
            ..Default::default()
        };
        assert!(matches!(settings.resolve(), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
api:
  domain: acme.tpondemand.com
  timeout: 10s
auth:
  mode: api_key
  api_key: abc123
  api_key_placement: header
retry:
  max_retries: 5
  initial_delay: 250ms
  backoff_factor: 1.5
cache:
  type_ttl: 10m
"#
        )
        .unwrap();
        drop(f);

        let config = GatewayConfig::load(Some(&path)).unwrap();
        assert_eq!(config.api.timeout, Duration::from_secs(10));
        assert_eq!(config.auth.mode, AuthMode::ApiKey);
        assert_eq!(config.auth.api_key_placement, ApiKeyPlacement::Header);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.cache.type_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GatewayConfig::load(Some(Path::new("/nonexistent/gateway.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_env_files_skips_missing() {
        let config = GatewayConfig {
            env_files: vec!["/nonexistent/path/.env".to_string()],
            ..Default::default()
        };
        config.load_env_files();
    }
}
