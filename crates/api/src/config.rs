use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use onboard_events::{EmailConfig, RetryPolicy};

use crate::auth::jwt::JwtConfig;

/// Default bind port.
const DEFAULT_PORT: u16 = 3009;
/// Default request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default initial backoff for welcome email retries, in milliseconds.
const DEFAULT_WELCOME_BACKOFF_MS: u64 = 1000;

/// Error raised when the environment holds a missing or malformed setting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3009`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Postgres connection string.
    pub database_url: String,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Retry budget for each step of the welcome email workflow.
    pub welcome_policy: RetryPolicy,
    /// SMTP settings; `None` disables the welcome email.
    pub email: Option<EmailConfig>,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `HOST`                     | `0.0.0.0`               |
    /// | `PORT`                     | `3009`                  |
    /// | `CORS_ORIGINS`             | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                    |
    /// | `DATABASE_URL`             | **required**            |
    /// | `JWT_SECRET`               | **required**            |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | `60`                    |
    /// | `WELCOME_EMAIL_RETRIES`    | `2`                     |
    /// | `WELCOME_EMAIL_BACKOFF_MS` | `1000`                  |
    ///
    /// SMTP variables are read by [`EmailConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&var, "PORT", DEFAULT_PORT)?;

        let cors_origins: Vec<String> = var("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                var: "CORS_ORIGINS",
                value: origin.clone(),
                reason: e.to_string(),
            })?;
        }

        let request_timeout_secs =
            parse_or(&var, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        let database_url = required(&var, "DATABASE_URL")?;
        let jwt = JwtConfig::from_lookup(&var)?;

        let defaults = RetryPolicy::default();
        let welcome_policy = RetryPolicy {
            retries: parse_or(&var, "WELCOME_EMAIL_RETRIES", defaults.retries)?,
            initial_backoff: Duration::from_millis(parse_or(
                &var,
                "WELCOME_EMAIL_BACKOFF_MS",
                DEFAULT_WELCOME_BACKOFF_MS,
            )?),
            max_backoff: defaults.max_backoff,
        };

        let email = EmailConfig::from_lookup(&var);

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            database_url,
            jwt,
            welcome_policy,
            email,
        })
    }
}

/// Read a variable that must be present and non-empty.
pub(crate) fn required(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    var(name)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Parse an optional variable, falling back to `default` when unset.
pub(crate) fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
