//! Factory for creating embedding providers from configuration

use crate::config::{EmbeddingProvider as EmbeddingProviderType, EmbeddingsConfig};
use crate::embeddings::providers::{BedrockEmbeddings, EmbeddingProvider, OpenAIEmbeddings};
use crate::error::Result;
use std::sync::Arc;

/// Factory for creating embedding providers
pub struct EmbeddingProviderFactory;

impl EmbeddingProviderFactory {
    /// Create an embedding provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be created
    pub async fn create(config: &EmbeddingsConfig) -> Result<Arc<dyn EmbeddingProvider>> {
        tracing::info!(
            provider = ?config.provider,
            model = %config.model,
            dimensions = config.dimensions,
            "creating embedding provider"
        );

        match config.provider {
            EmbeddingProviderType::Bedrock => Ok(Arc::new(BedrockEmbeddings::new(config).await?)),
            EmbeddingProviderType::OpenAI => Ok(Arc::new(OpenAIEmbeddings::new(config)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_bedrock_provider() {
        let config = EmbeddingsConfig {
            base_url: Some("http://localhost:1".to_string()),
            ..Default::default()
        };
        let provider = EmbeddingProviderFactory::create(&config).await.unwrap();
        assert_eq!(provider.model(), "amazon.titan-embed-text-v2:0");
        assert_eq!(provider.dimension(), 1024);
    }

    #[tokio::test]
    async fn test_create_openai_provider_with_key() {
        let config = EmbeddingsConfig {
            provider: EmbeddingProviderType::OpenAI,
            model: "text-embedding-3-small".to_string(),
            dimensions: 512,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let provider = EmbeddingProviderFactory::create(&config).await.unwrap();
        assert_eq!(provider.model(), "text-embedding-3-small");
        assert_eq!(provider.dimension(), 512);
    }
}
