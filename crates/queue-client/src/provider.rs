//! Provider types and configuration.
//!
//! Configuration is assembled with the `config` crate from an optional file
//! (YAML, TOML or JSON, chosen by extension) overlaid with environment
//! variables prefixed `QUEUE_CLIENT__`, using `__` as the nesting separator:
//!
//! ```text
//! QUEUE_CLIENT__RECEIVE_WAIT_SECONDS=10
//! QUEUE_CLIENT__PROVIDER__TYPE=sqs
//! QUEUE_CLIENT__PROVIDER__REGION=eu-west-1
//! ```

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "QUEUE_CLIENT";

/// Longest receive wait SQS accepts for long polling
pub const SQS_MAX_WAIT_SECONDS: u64 = 20;

/// Enumeration of supported queue providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    AwsSqs,
    InMemory,
}

impl ProviderType {
    /// Get maximum message size for provider
    pub fn max_message_size(&self) -> usize {
        match self {
            Self::AwsSqs => 256 * 1024,         // 256KB
            Self::InMemory => 10 * 1024 * 1024, // 10MB
        }
    }

    /// Stable provider name used in errors and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwsSqs => "AwsSqs",
            Self::InMemory => "InMemory",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for queue client initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Bounded wait used by every receive
    #[serde(default = "default_receive_wait_seconds")]
    pub receive_wait_seconds: u64,
    /// Deadline applied to operations whose context supplies none
    #[serde(default = "default_operation_timeout_seconds")]
    pub operation_timeout_seconds: Option<u64>,
}

fn default_receive_wait_seconds() -> u64 {
    5
}

fn default_operation_timeout_seconds() -> Option<u64> {
    Some(30)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            receive_wait_seconds: default_receive_wait_seconds(),
            operation_timeout_seconds: default_operation_timeout_seconds(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigurationError::Missing {
                    key: path.display().to_string(),
                });
            }
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })?;

        let config: ClientConfig =
            settings
                .try_deserialize()
                .map_err(|e| ConfigurationError::Parsing {
                    message: e.to_string(),
                })?;

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values no provider can honour
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some(timeout) = self.operation_timeout_seconds {
            if timeout <= self.receive_wait_seconds {
                return Err(ConfigurationError::Invalid {
                    message: "operation_timeout_seconds must exceed receive_wait_seconds"
                        .to_string(),
                });
            }
        }

        match &self.provider {
            ProviderConfig::AwsSqs(sqs) => {
                if self.receive_wait_seconds > SQS_MAX_WAIT_SECONDS {
                    return Err(ConfigurationError::Invalid {
                        message: format!(
                            "receive_wait_seconds must be at most {} for SQS",
                            SQS_MAX_WAIT_SECONDS
                        ),
                    });
                }
                sqs.validate()
            }
            ProviderConfig::InMemory(memory) => memory.validate(),
        }
    }

    /// Bounded wait for a single receive
    pub fn receive_wait(&self) -> Duration {
        Duration::from_secs(self.receive_wait_seconds)
    }

    /// Default per-operation deadline
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_seconds.map(Duration::from_secs)
    }

    /// Provider selected by this configuration
    pub fn provider_type(&self) -> ProviderType {
        match self.provider {
            ProviderConfig::AwsSqs(_) => ProviderType::AwsSqs,
            ProviderConfig::InMemory(_) => ProviderType::InMemory,
        }
    }
}

/// Provider-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    #[serde(rename = "sqs")]
    AwsSqs(AwsSqsConfig),
    InMemory(InMemoryConfig),
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::InMemory(InMemoryConfig::default())
    }
}

/// AWS SQS configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AwsSqsConfig {
    pub region: String,
    /// Override for LocalStack or other SQS-compatible endpoints
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default, serialize_with = "redact")]
    pub secret_access_key: Option<String>,
    #[serde(default, serialize_with = "redact")]
    pub session_token: Option<String>,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Visibility timeout requested on receive; queue default when absent
    #[serde(default)]
    pub visibility_timeout_seconds: Option<u32>,
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn redact<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_some("<redacted>"),
        None => serializer.serialize_none(),
    }
}

impl AwsSqsConfig {
    /// Create configuration for a region with all other settings defaulted
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            request_timeout_seconds: default_request_timeout_seconds(),
            visibility_timeout_seconds: None,
        }
    }

    /// Use an explicit endpoint instead of the regional AWS one
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Use static credentials
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.region.trim().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "provider.region".to_string(),
            });
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid {
                message: "request_timeout_seconds must be greater than zero".to_string(),
            });
        }

        if let Some(ref endpoint) = self.endpoint {
            url::Url::parse(endpoint).map_err(|e| ConfigurationError::Invalid {
                message: format!("endpoint '{}' is not a valid URL: {}", endpoint, e),
            })?;
        }

        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ConfigurationError::Invalid {
                message: "access_key_id and secret_access_key must be set together".to_string(),
            });
        }

        Ok(())
    }
}

impl fmt::Debug for AwsSqsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSqsConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field(
                "visibility_timeout_seconds",
                &self.visibility_timeout_seconds,
            )
            .finish()
    }
}

/// In-memory provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryConfig {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
    #[serde(default = "default_visibility_timeout_seconds")]
    pub visibility_timeout_seconds: u64,
    /// Delay before a sent message becomes visible
    #[serde(default)]
    pub delivery_delay_ms: u64,
    #[serde(default = "default_message_retention_seconds")]
    pub message_retention_seconds: u64,
}

fn default_max_queue_size() -> usize {
    10000
}

fn default_visibility_timeout_seconds() -> u64 {
    30
}

fn default_message_retention_seconds() -> u64 {
    4 * 24 * 60 * 60
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            visibility_timeout_seconds: default_visibility_timeout_seconds(),
            delivery_delay_ms: 0,
            message_retention_seconds: default_message_retention_seconds(),
        }
    }
}

impl InMemoryConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    pub fn delivery_delay(&self) -> Duration {
        Duration::from_millis(self.delivery_delay_ms)
    }

    pub fn message_retention(&self) -> Duration {
        Duration::from_secs(self.message_retention_seconds)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_queue_size == 0 {
            return Err(ConfigurationError::Invalid {
                message: "max_queue_size must be greater than zero".to_string(),
            });
        }

        if self.visibility_timeout_seconds == 0 {
            return Err(ConfigurationError::Invalid {
                message: "visibility_timeout_seconds must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
