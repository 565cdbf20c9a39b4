//! Configuration management for Athletes Sync

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://localhost:3000`
    pub base_url: String,
    /// Collection path segment appended to `base_url`
    pub resource: String,
    /// Per-request timeout; `None` waits indefinitely
    pub timeout_secs: Option<u64>,
    pub form_clear: FormClearPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// When the add form is reset relative to the create request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormClearPolicy {
    /// Clear as soon as the request is dispatched, even if it later fails
    #[default]
    OnDispatch,
    /// Clear only once the server has confirmed the new record
    OnSuccess,
}

impl FromStr for FormClearPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on-dispatch" | "dispatch" => Ok(FormClearPolicy::OnDispatch),
            "on-success" | "success" => Ok(FormClearPolicy::OnSuccess),
            other => Err(other.to_string()),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: "http://localhost:3000".to_string(),
            resource: "athletes".to_string(),
            timeout_secs: None,
            form_clear: FormClearPolicy::OnDispatch,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client: ClientConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Client configuration for a given origin with defaults elsewhere
    pub fn with_base_url(base_url: &str) -> Self {
        ClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    /// Full collection endpoint, `{base_url}/{resource}`
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.resource.trim_matches('/')
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let timeout_secs: Option<u64> = match env::var("ATHLETES_TIMEOUT_SECS") {
            Ok(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "ATHLETES_TIMEOUT_SECS",
                value: raw.clone(),
            })?),
            Err(_) => None,
        };

        let form_clear: FormClearPolicy = match env::var("ATHLETES_FORM_CLEAR") {
            Ok(raw) => raw.parse().map_err(|value| ConfigError::InvalidValue {
                var: "ATHLETES_FORM_CLEAR",
                value,
            })?,
            Err(_) => defaults.client.form_clear,
        };

        let port: u16 = match env::var("SERVER_PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "SERVER_PORT",
                value: raw.clone(),
            })?,
            Err(_) => defaults.server.port,
        };

        Ok(Config {
            client: ClientConfig {
                base_url: env::var("ATHLETES_BASE_URL").unwrap_or(defaults.client.base_url),
                resource: env::var("ATHLETES_RESOURCE").unwrap_or(defaults.client.resource),
                timeout_secs,
                form_clear,
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port,
            },
        })
    }
}
