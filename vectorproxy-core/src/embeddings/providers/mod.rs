//! Embedding provider implementations

use crate::error::Result;
use async_trait::async_trait;

pub mod bedrock;
pub mod openai;

pub use bedrock::BedrockEmbeddings;
pub use openai::OpenAIEmbeddings;

/// Trait for embedding provider implementations.
///
/// Providers are shared by every pipeline worker, so implementations must be
/// safe for concurrent use.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ProxyError::Embedding`] when the provider cannot
    /// be reached, rejects the request or answers with an unreadable body.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of the embeddings produced by this provider.
    fn dimension(&self) -> usize;

    /// Model identifier used for every call.
    fn model(&self) -> &str;
}
