//! Embedding provider implementations for turning text fields into vectors.

pub mod factory;
pub mod providers;

pub use factory::EmbeddingProviderFactory;
pub use providers::{BedrockEmbeddings, EmbeddingProvider, OpenAIEmbeddings};
