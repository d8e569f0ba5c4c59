#[cfg(test)]
mod tests;

use std::env;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::AssistantError;
use crate::documents::ChunkingConfig;

/// Required environment variables. Absence is a startup-time error, never
/// a deferred failure deep in a request.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_ENDPOINT: &str = "TARGET_URL";
pub const ENV_DEPLOYMENT: &str = "DEPLOYMENT_NAME";

/// Optional environment variables with defaults.
pub const ENV_EMBEDDING_DEPLOYMENT: &str = "EMBEDDING_DEPLOYMENT";
pub const ENV_API_VERSION: &str = "OPENAI_API_VERSION";
pub const ENV_BATCH_SIZE: &str = "EMBEDDING_BATCH_SIZE";

pub const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "text-embedding-ada-002";
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_BATCH_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub service: ServiceConfig,
    pub chunking: ChunkingConfig,
}

/// Connection settings for the hosted embedding and completion services.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub api_key: String,
    pub endpoint: Url,
    /// Default completion model/deployment name.
    pub deployment: String,
    pub embedding_deployment: String,
    pub api_version: String,
    /// Embedding request batch size. Affects throughput only, never
    /// results.
    pub batch_size: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid endpoint URL '{0}': {1}")]
    InvalidEndpoint(String, String),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(String),
    #[error("Invalid deployment name: cannot be empty")]
    EmptyDeployment,
    #[error("Invalid API key: cannot be empty")]
    EmptyApiKey,
    #[error("Invalid chunking config: overlap ({overlap}) must be smaller than max chunk size ({max})")]
    OverlapTooLarge { overlap: usize, max: usize },
}

impl From<ConfigError> for AssistantError {
    #[inline]
    fn from(e: ConfigError) -> Self {
        AssistantError::Config(e.to_string())
    }
}

impl Config {
    /// Load configuration from the process environment, honoring a local
    /// `.env` file when present.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal; anything else is worth a warning.
        if let Err(e) = dotenvy::dotenv() {
            if !matches!(e, dotenvy::Error::Io(_)) {
                warn!("Failed to load .env file: {}", e);
            }
        }

        let config = Self {
            service: ServiceConfig::from_env()?,
            chunking: ChunkingConfig::default(),
        };
        config.validate()?;

        debug!(
            "Loaded configuration: endpoint {}, deployment {}, embedding deployment {}",
            config.service.endpoint, config.service.deployment, config.service.embedding_deployment
        );
        Ok(config)
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service.validate()?;
        if self.chunking.overlap_chars >= self.chunking.max_chunk_chars {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.chunking.overlap_chars,
                max: self.chunking.max_chunk_chars,
            });
        }
        Ok(())
    }
}

impl ServiceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = required_var(ENV_API_KEY)?;
        let endpoint_raw = required_var(ENV_ENDPOINT)?;
        let deployment = required_var(ENV_DEPLOYMENT)?;

        let endpoint = Url::parse(&endpoint_raw)
            .map_err(|e| ConfigError::InvalidEndpoint(endpoint_raw, e.to_string()))?;

        let embedding_deployment = optional_var(ENV_EMBEDDING_DEPLOYMENT)
            .unwrap_or_else(|| DEFAULT_EMBEDDING_DEPLOYMENT.to_string());
        let api_version =
            optional_var(ENV_API_VERSION).unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let batch_size = match optional_var(ENV_BATCH_SIZE) {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidBatchSize(raw))?,
            None => DEFAULT_BATCH_SIZE,
        };

        Ok(Self {
            api_key,
            endpoint,
            deployment,
            embedding_deployment,
            api_version,
            batch_size,
        })
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        if self.deployment.trim().is_empty() || self.embedding_deployment.trim().is_empty() {
            return Err(ConfigError::EmptyDeployment);
        }
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size.to_string()));
        }
        Ok(())
    }
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
