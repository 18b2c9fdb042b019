//! Configuration loaded from the environment.
//!
//! Call `dotenvy::dotenv()` before [`Config::from_env`] to pick up a local
//! `.env` file.

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub google: GoogleConfig,
    pub estimation: EstimationConfig,
    pub http: HttpConfig,
    pub deployment: DeploymentConfig,
}

impl Config {
    /// Build the configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            google: GoogleConfig::from_env(),
            estimation: EstimationConfig::from_env()?,
            http: HttpConfig::from_env()?,
            deployment: DeploymentConfig::from_env(),
        })
    }
}

/// Google Gemini provider settings.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// API key. `None` leaves the estimation endpoints unavailable.
    pub api_key: Option<SecretString>,
    pub model: String,
    /// Base of the OpenAI-compatible endpoint.
    pub base_url: String,
}

impl GoogleConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-flash";
    pub const DEFAULT_BASE_URL: &'static str =
        "https://generativelanguage.googleapis.com/v1beta/openai";

    fn from_env() -> Self {
        let api_key = optional_env("GEMINI_API_KEY")
            .or_else(|| optional_env("GOOGLE_API_KEY"))
            .map(SecretString::from);

        Self {
            api_key,
            model: optional_env("GEMINI_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            base_url: optional_env("GEMINI_BASE_URL")
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Retry and timeout settings for the estimation pipeline.
#[derive(Debug, Clone)]
pub struct EstimationConfig {
    /// Retries after a throttled attempt (total attempts = retries + 1).
    pub max_retries: u32,
    /// Delay used when the provider gives no retry hint.
    pub default_retry_delay: Duration,
    /// Upper bound for one item's whole pipeline, retries included.
    pub item_timeout: Duration,
}

impl EstimationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_retries: parse_env("ESTIMATE_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            default_retry_delay: parse_env::<u64>("ESTIMATE_RETRY_DELAY_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_retry_delay),
            item_timeout: parse_env::<u64>("ESTIMATE_ITEM_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.item_timeout),
        })
    }
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_retry_delay: Duration::from_secs(5),
            item_timeout: Duration::from_secs(180),
        }
    }
}

/// HTTP API bind settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional_env("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_env("HTTP_PORT")?.unwrap_or(3000),
        })
    }
}

/// Where the service runs. Only affects diagnostics and remediation hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployTarget {
    Local,
    Hosted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentConfig {
    pub target: DeployTarget,
    /// Include internal error detail in API responses.
    pub development: bool,
}

impl DeploymentConfig {
    fn from_env() -> Self {
        let target = match optional_env("DEPLOY_TARGET").as_deref() {
            Some("hosted") => DeployTarget::Hosted,
            _ => DeployTarget::Local,
        };
        let development = optional_env("APP_ENV").as_deref() == Some("development");
        Self {
            target,
            development,
        }
    }

    /// Remediation hint shown when no API key is configured.
    pub fn missing_key_hint(&self) -> &'static str {
        match self.target {
            DeployTarget::Hosted => {
                "Add GEMINI_API_KEY to the environment variables in your hosting dashboard and redeploy."
            }
            DeployTarget::Local => {
                "Set GEMINI_API_KEY in the .env file and restart the server."
            }
        }
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            target: DeployTarget::Local,
            development: false,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}
