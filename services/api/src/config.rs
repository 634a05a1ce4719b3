//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_AUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
pub const DEFAULT_API_URL: &str = "https://gigachat.devices.sberbank.ru/api/v1";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Settings for the GigaChat provider. Fixed for the lifetime of the client.
///
/// The production endpoints are signed by a certificate authority missing from
/// most default trust stores. Either install that root certificate on the host
/// or set `accept_invalid_certs` (`GIGACHAT_ACCEPT_INVALID_CERTS=true`);
/// otherwise every call fails the TLS handshake.
#[derive(Clone)]
pub struct GigaChatConfig {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    /// Full URL of the OAuth token endpoint.
    pub auth_url: String,
    /// Base URL; `/chat/completions` is appended.
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl GigaChatConfig {
    /// Provider settings with the production endpoints and default model parameters.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: "GIGACHAT_API_PERS".to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            model: "GigaChat".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            request_timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

// The secret must never reach the logs.
impl std::fmt::Debug for GigaChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GigaChatConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("auth_url", &self.auth_url)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub gigachat: GigaChatConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load GigaChat Settings ---
        let defaults =
            GigaChatConfig::new(required("GIGACHAT_CLIENT_ID")?, required("GIGACHAT_CLIENT_SECRET")?);
        let timeout_secs: u64 = parsed_or("GIGACHAT_TIMEOUT_SECS", defaults.request_timeout.as_secs())?;
        let gigachat = GigaChatConfig {
            scope: std::env::var("GIGACHAT_SCOPE").unwrap_or(defaults.scope.clone()),
            auth_url: std::env::var("GIGACHAT_AUTH_URL").unwrap_or(defaults.auth_url.clone()),
            api_url: std::env::var("GIGACHAT_API_URL").unwrap_or(defaults.api_url.clone()),
            model: std::env::var("GIGACHAT_MODEL").unwrap_or(defaults.model.clone()),
            max_tokens: parsed_or("GIGACHAT_MAX_TOKENS", defaults.max_tokens)?,
            temperature: parsed_or("GIGACHAT_TEMPERATURE", defaults.temperature)?,
            request_timeout: Duration::from_secs(timeout_secs),
            accept_invalid_certs: parsed_or("GIGACHAT_ACCEPT_INVALID_CERTS", false)?,
            ..defaults
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            gigachat,
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn parsed_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_defaults_match_production() {
        let config = GigaChatConfig::new("id", "secret");
        assert_eq!(config.scope, "GIGACHAT_API_PERS");
        assert_eq!(config.model, "GigaChat");
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", GigaChatConfig::new("id", "top-secret"));
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn unparsable_numbers_are_reported() {
        std::env::set_var("STUDENT_HELPER_TEST_MAX_TOKENS", "many");
        let result: Result<u32, _> = parsed_or("STUDENT_HELPER_TEST_MAX_TOKENS", 10);
        assert!(matches!(result, Err(ConfigError::InvalidValue(name, _)) if name == "STUDENT_HELPER_TEST_MAX_TOKENS"));

        let fallback: u32 = parsed_or("STUDENT_HELPER_TEST_UNSET_VAR", 10).unwrap();
        assert_eq!(fallback, 10);
    }
}
