use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::auth::DEFAULT_COOKIE_NAME;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Listen host address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// User service base URL
    pub users_url: String,

    /// Content service base URL
    pub content_url: String,

    /// Shared secret for token signing
    #[serde(skip_serializing)]
    pub secret_key: String,

    /// Token signing algorithm
    pub jwt_algorithm: JwtAlgorithm,

    /// Token and cookie lifetime in seconds
    pub token_ttl_secs: u64,

    /// Name of the credential cookie
    pub cookie_name: String,

    /// Mark the credential cookie `Secure`
    pub cookie_secure: bool,

    /// Where credentials are read from
    pub credential_source: CredentialSource,

    /// Upstream request timeout in seconds
    pub request_timeout_secs: u64,

    /// Extra attempts for idempotent GETs after a transport failure
    pub upstream_get_retries: u32,

    /// Maximum inbound body size in bytes
    pub max_body_size_bytes: usize,

    /// Interval between identity cache sweeps
    pub cache_sweep_interval_secs: u64,

    /// Origins allowed to make credentialed cross-origin requests
    pub cors_allowed_origins: Vec<String>,

    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl std::str::FromStr for JwtAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "HS256" => Ok(JwtAlgorithm::HS256),
            "HS384" => Ok(JwtAlgorithm::HS384),
            "HS512" => Ok(JwtAlgorithm::HS512),
            _ => anyhow::bail!("Unsupported JWT algorithm: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CredentialSource {
    /// Only the credential cookie
    Cookie,
    /// Only `Authorization: Bearer`
    Bearer,
    /// Either, the cookie taking precedence
    #[default]
    Either,
}

impl std::str::FromStr for CredentialSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cookie" => Ok(CredentialSource::Cookie),
            "bearer" => Ok(CredentialSource::Bearer),
            "either" => Ok(CredentialSource::Either),
            _ => anyhow::bail!("Unsupported credential source: {}", s),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            users_url: "http://localhost:8081".to_string(),
            content_url: "http://localhost:8082".to_string(),
            secret_key: String::new(),
            jwt_algorithm: JwtAlgorithm::HS256,
            token_ttl_secs: 7200,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_secure: false,
            credential_source: CredentialSource::Either,
            request_timeout_secs: 30,
            upstream_get_retries: 1,
            max_body_size_bytes: 10 * 1024 * 1024,
            cache_sweep_interval_secs: 300,
            cors_allowed_origins: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = std::env::var("GATEWAY_HOST").unwrap_or(defaults.host);

        let port = match std::env::var("PORT") {
            Ok(port) => port
                .trim_start_matches(':')
                .parse()
                .context("Invalid PORT")?,
            Err(_) => defaults.port,
        };

        let users_url = std::env::var("USERS_HOST").unwrap_or(defaults.users_url);

        let content_url = std::env::var("MEHMS_HOST").unwrap_or(defaults.content_url);

        let secret_key = std::env::var("SECRET_KEY").unwrap_or_default();

        let jwt_algorithm = match std::env::var("JWT_ALGORITHM") {
            Ok(alg) => alg.parse()?,
            Err(_) => defaults.jwt_algorithm,
        };

        let token_ttl_secs = env_or("TOKEN_TTL_SECS", defaults.token_ttl_secs)?;

        let cookie_name = std::env::var("COOKIE_NAME").unwrap_or(defaults.cookie_name);

        let cookie_secure = env_or("COOKIE_SECURE", defaults.cookie_secure)?;

        let credential_source = match std::env::var("CREDENTIAL_SOURCE") {
            Ok(source) => source.parse()?,
            Err(_) => defaults.credential_source,
        };

        let request_timeout_secs = env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?;

        let upstream_get_retries = env_or("UPSTREAM_GET_RETRIES", defaults.upstream_get_retries)?;

        let max_body_size_bytes = env_or("MAX_BODY_SIZE_BYTES", defaults.max_body_size_bytes)?;

        let cache_sweep_interval_secs =
            env_or("CACHE_SWEEP_INTERVAL_SECS", defaults.cache_sweep_interval_secs)?;

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|origins| parse_list(&origins))
            .unwrap_or_default();

        let log_level = std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            host,
            port,
            users_url,
            content_url,
            secret_key,
            jwt_algorithm,
            token_ttl_secs,
            cookie_name,
            cookie_secure,
            credential_source,
            request_timeout_secs,
            upstream_get_retries,
            max_body_size_bytes,
            cache_sweep_interval_secs,
            cors_allowed_origins,
            log_level,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            anyhow::bail!("SECRET_KEY must be set");
        }

        validate_upstream_url("USERS_HOST", &self.users_url)?;
        validate_upstream_url("MEHMS_HOST", &self.content_url)?;

        if self.token_ttl_secs == 0 {
            anyhow::bail!("TOKEN_TTL_SECS must be greater than 0");
        }

        if self.cookie_name.trim().is_empty() {
            anyhow::bail!("COOKIE_NAME cannot be empty");
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        if self.max_body_size_bytes == 0 {
            anyhow::bail!("MAX_BODY_SIZE_BYTES must be greater than 0");
        }

        if self.cache_sweep_interval_secs == 0 {
            anyhow::bail!("CACHE_SWEEP_INTERVAL_SECS must be greater than 0");
        }

        for origin in &self.cors_allowed_origins {
            if origin == "*" {
                anyhow::bail!("CORS_ALLOWED_ORIGINS cannot contain '*' when credentials are allowed");
            }
            origin
                .parse::<http::HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", origin))?;
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs as i64)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }

    /// Get the listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_upstream_url(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }

    let url = Url::parse(value).with_context(|| format!("{} is not a valid URL: {}", name, value))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("{} must use http or https, got {}", name, other),
    }
}
