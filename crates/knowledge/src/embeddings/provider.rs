//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{MockEmbedder, OllamaEmbedder};
use ragdesk_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Expected embedding length, if the provider knows it up front
    fn dimensions(&self) -> Option<usize>;

    /// Generate the embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>>;

    /// Embed several texts, one request at a time.
    ///
    /// Each input gets its own result so one failure does not discard the
    /// vectors already computed for its neighbours.
    async fn embed_batch(&self, texts: &[String]) -> Vec<AppResult<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await);
        }
        results
    }
}

/// Create an embedding provider based on configuration.
///
/// Returns `Ok(None)` for the `none` provider: records are then stored
/// without vectors and never match a search.
///
/// # Arguments
/// * `config` - Embedding section of the knowledge base config
/// * `fallback_endpoint` - Ollama URL used when the section names none
pub fn create_provider(
    config: &EmbeddingConfig,
    fallback_endpoint: &str,
) -> AppResult<Option<Arc<dyn EmbeddingProvider>>> {
    config.validate()?;

    match config.provider.as_str() {
        "mock" => {
            let provider = MockEmbedder::new(config.dimensions.unwrap_or(MockEmbedder::DEFAULT_DIMENSIONS));
            Ok(Some(Arc::new(provider)))
        }

        "ollama" => {
            let endpoint = config.endpoint.as_deref().unwrap_or(fallback_endpoint);
            let provider = OllamaEmbedder::new(config, endpoint)?;
            Ok(Some(Arc::new(provider)))
        }

        "none" => Ok(None),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&EmbeddingConfig::mock(384), "http://localhost:11434")
            .unwrap()
            .unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), Some(384));
    }

    #[test]
    fn test_create_ollama_provider_uses_fallback_endpoint() {
        let provider = create_provider(&EmbeddingConfig::default(), "http://gpu-box:11434")
            .unwrap()
            .unwrap();
        assert_eq!(provider.provider_name(), "ollama");
        assert_eq!(provider.model_name(), "nomic-embed-text");
    }

    #[test]
    fn test_create_none_provider() {
        let config = EmbeddingConfig {
            provider: "none".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config, "http://localhost:11434")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "gguf".to_string(),
            ..EmbeddingConfig::default()
        };
        let result = create_provider(&config, "http://localhost:11434");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_default_batch_keeps_order() {
        let provider = MockEmbedder::new(32);
        let texts = vec!["cardiology wing".to_string(), "parking garage".to_string()];

        let results = provider.embed_batch(&texts).await;
        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first, &provider.embed("cardiology wing").await.unwrap());
    }
}
