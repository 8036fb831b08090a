//! Embedding configuration types.

use ragdesk_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Embedding providers a knowledge base may name.
pub const EMBEDDING_PROVIDERS: [&str; 3] = ["ollama", "mock", "none"];

/// Embedding configuration for a knowledge base.
///
/// Stored under the `embedding:` key of the base's `config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "ollama", "mock" or "none"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_model")]
    pub model: String,

    /// Expected vector length; `None` accepts whatever the model returns
    #[serde(default = "default_dimensions")]
    pub dimensions: Option<usize>,

    /// Ollama base URL; falls back to the workspace endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per text before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_dimensions() -> Option<usize> {
    Some(768)
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_max_retries() -> u32 {
    3
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dimensions: default_dimensions(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl EmbeddingConfig {
    /// Configuration for the offline hashing embedder.
    pub fn mock(dimensions: usize) -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: Some(dimensions),
            ..Self::default()
        }
    }

    /// Reject settings no provider could honour.
    pub fn validate(&self) -> AppResult<()> {
        if !EMBEDDING_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: '{}'. Supported providers: {}",
                self.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.dimensions == Some(0) {
            return Err(AppError::Config(
                "Embedding dimensions must be positive".to_string(),
            ));
        }

        if self.timeout_secs == 0 || self.max_retries == 0 {
            return Err(AppError::Config(
                "Embedding timeout and retry count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "nomic-embed-text");
        assert_eq!(config.dimensions, Some(768));
        assert_eq!(config.timeout_secs, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: EmbeddingConfig = serde_yaml::from_str("provider: mock\ndimensions: 64\n").unwrap();
        assert_eq!(config.provider, "mock");
        assert_eq!(config.dimensions, Some(64));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            ..EmbeddingConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let config = EmbeddingConfig {
            dimensions: Some(0),
            ..EmbeddingConfig::mock(8)
        };
        assert!(config.validate().is_err());
    }
}
