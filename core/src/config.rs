//! Client configuration loaded from the environment or any serde source.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::ConfigError;

pub const ENDPOINT_VAR: &str = "HTTPCALL_ENDPOINT";
pub const TIMEOUT_VAR: &str = "HTTPCALL_TIMEOUT_MS";

/// Serializable settings for a `Client`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Default per-call deadline in milliseconds. Absent or zero means none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ClientConfig {
    /// Read `HTTPCALL_ENDPOINT` and `HTTPCALL_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, with variables resolved through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = lookup(ENDPOINT_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing { name: ENDPOINT_VAR })?;
        let timeout_ms = match lookup(TIMEOUT_VAR) {
            None => None,
            Some(value) => Some(value.trim().parse().map_err(|_| ConfigError::InvalidTimeout {
                name: TIMEOUT_VAR,
                value,
            })?),
        };
        Ok(Self {
            endpoint,
            timeout_ms,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Client with the default transport and these settings.
    pub fn into_client(self) -> Client {
        Client::from_config(self)
    }
}

impl Client {
    pub fn from_config(config: ClientConfig) -> Self {
        let timeout = config.timeout();
        let mut client = Client::new(config.endpoint);
        client.timeout = timeout;
        client
    }
}
