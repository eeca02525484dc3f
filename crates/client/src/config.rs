//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `CRAFTIFY_API_URL` - Base URL of the marketplace REST API
//!   (default: `http://127.0.0.1:8000/api/`)
//! - `CRAFTIFY_TOKEN_PATH` - File holding the persisted credential
//!   (default: `$HOME/.craftify/session.json`)
//! - `CRAFTIFY_HTTP_TIMEOUT_SECS` - Transport request timeout (default: 30)
//! - `CRAFTIFY_CATALOG_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CATALOG_CACHE_TTL_SECS: u64 = 300;
const TOKEN_DIR: &str = ".craftify";
const TOKEN_FILE: &str = "session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Marketplace client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, always ending in `/`
    pub api_url: Url,
    /// Where the bearer credential is persisted between runs
    pub token_path: PathBuf,
    /// Request timeout applied by the transport
    pub http_timeout: Duration,
    /// How long catalog responses stay cached
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_env_or_default("CRAFTIFY_API_URL", DEFAULT_API_URL))?;
        let token_path = get_optional_env("CRAFTIFY_TOKEN_PATH")
            .map_or_else(default_token_path, PathBuf::from);
        let http_timeout = Duration::from_secs(get_secs(
            "CRAFTIFY_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let catalog_cache_ttl = Duration::from_secs(get_secs(
            "CRAFTIFY_CATALOG_CACHE_TTL_SECS",
            DEFAULT_CATALOG_CACHE_TTL_SECS,
        )?);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api_url,
            token_path,
            http_timeout,
            catalog_cache_ttl,
            sentry_dsn,
        })
    }

    /// Configuration pointing at a given API base URL with default settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed.
    pub fn for_api_url(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            token_path: default_token_path(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CATALOG_CACHE_TTL_SECS),
            sentry_dsn: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse a positive number of seconds.
fn get_secs(key: &str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Parse the API base URL, enforcing a trailing slash so relative joins keep
/// the full path (`/api/` + `cart/` rather than `/cart/`).
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar("CRAFTIFY_API_URL".to_string(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "CRAFTIFY_API_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Default credential location under the user's home directory.
fn default_token_path() -> PathBuf {
    get_optional_env("HOME").map_or_else(
        || PathBuf::from(TOKEN_DIR).join(TOKEN_FILE),
        |home| PathBuf::from(home).join(TOKEN_DIR).join(TOKEN_FILE),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_url_adds_trailing_slash() {
        let url = parse_api_url("http://localhost:8000/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        assert_eq!(url.join("cart/").unwrap().path(), "/api/cart/");
    }

    #[test]
    fn test_parse_api_url_keeps_existing_slash() {
        let url = parse_api_url("https://market.example.com/api/").unwrap();
        assert_eq!(url.as_str(), "https://market.example.com/api/");
    }

    #[test]
    fn test_parse_api_url_rejects_garbage() {
        let err = parse_api_url("not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));

        let err = parse_api_url("mailto:someone@example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_for_api_url_defaults() {
        let config = ClientConfig::for_api_url(DEFAULT_API_URL).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.catalog_cache_ttl, Duration::from_secs(300));
        assert!(config.token_path.ends_with("session.json"));
        assert!(config.sentry_dsn.is_none());
    }
}
