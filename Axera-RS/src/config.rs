use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{AxeraError, Result};

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://m5:5000";

/// Configuration for [`AxeraClient`](crate::AxeraClient).
///
/// Use [`ClientConfig::builder()`] for ergonomic construction,
/// [`ClientConfig::load()`] to read a TOML file, or
/// [`ClientConfig::default()`] for the stock endpoint and timeouts.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Service base URL, without trailing slash.
    pub base_url: String,

    /// Timeout for `/generate` requests.
    pub generate_timeout: Duration,

    /// Timeout for `/interrogate` and `/interrogate/structured`.
    pub interrogate_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            generate_timeout: Duration::from_secs(60),
            interrogate_timeout: Duration::from_secs(30),
        }
    }
}

/// On-disk shape. Every key is optional and falls back to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    generate_timeout_secs: Option<u64>,
    interrogate_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Parse a TOML document such as:
    ///
    /// ```toml
    /// base_url = "http://192.168.1.20:5000"
    /// generate_timeout_secs = 90
    /// interrogate_timeout_secs = 30
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| AxeraError::InvalidConfig(format!("bad config file: {}", e)))?;

        let mut builder = Self::builder();
        if let Some(url) = file.base_url {
            builder = builder.with_base_url(url);
        }
        if let Some(secs) = file.generate_timeout_secs {
            builder = builder.with_generate_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = file.interrogate_timeout_secs {
            builder = builder.with_interrogate_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the service base URL. Trailing slashes are dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = normalize_base_url(url.into());
        self
    }

    /// Set the `/generate` timeout.
    pub fn with_generate_timeout(mut self, timeout: Duration) -> Self {
        self.config.generate_timeout = timeout;
        self
    }

    /// Set the interrogation timeout.
    pub fn with_interrogate_timeout(mut self, timeout: Duration) -> Self {
        self.config.interrogate_timeout = timeout;
        self
    }

    /// Validate and build the final [`ClientConfig`].
    pub fn build(self) -> Result<ClientConfig> {
        let config = self.config;
        if config.base_url.is_empty() {
            return Err(AxeraError::InvalidConfig("base URL is empty".into()));
        }
        if config.generate_timeout.is_zero() || config.interrogate_timeout.is_zero() {
            return Err(AxeraError::InvalidConfig(
                "timeouts must be greater than zero".into(),
            ));
        }
        Ok(config)
    }
}

pub(crate) fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
