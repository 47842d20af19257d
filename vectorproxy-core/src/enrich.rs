//! Field enrichment: writes `<field>_embedding` vectors into a document
//!
//! Embedding failures are absorbed here. A field whose embedding cannot be
//! produced is logged and left as it was; the rest of the document carries
//! on. Only structural write failures escape as errors.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::embeddings::EmbeddingProvider;
use crate::error::{ProxyError, Result};
use crate::path::{Match, PathExpression, document, resolve};

/// Document after one path expression has been applied
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedDocument {
    /// The (possibly unchanged) document
    pub document: Value,
    /// Fields that received an embedding
    pub embedded: usize,
    /// Fields whose embedding call failed
    pub failed: usize,
    /// Embeddings written, in the order they were applied
    pub writes: Vec<EmbeddingWrite>,
}

/// One `<field>_embedding` value set on a document
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingWrite {
    /// Concrete target path
    pub path: PathExpression,
    /// Vector as written
    pub vector: Value,
}

impl EnrichedDocument {
    pub fn is_modified(&self) -> bool {
        self.embedded > 0
    }
}

/// Applies path expressions to documents using an embedding provider
#[derive(Clone)]
pub struct FieldEnricher {
    provider: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for FieldEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldEnricher")
            .field("model", &self.provider.model())
            .finish()
    }
}

#[derive(Default)]
struct Counts {
    embedded: usize,
    failed: usize,
    writes: Vec<EmbeddingWrite>,
}

impl FieldEnricher {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Enrich every field matched by `expression`.
    ///
    /// Nested arrays are followed to any depth. Each scalar match is embedded
    /// and the vector written at `<resolved-path>_embedding`, replacing any
    /// prior value.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Document`] when an embedding cannot be written
    /// into the document. Embedding failures are never returned.
    pub async fn enrich(
        &self,
        mut document: Value,
        expression: &PathExpression,
    ) -> Result<EnrichedDocument> {
        let mut counts = Counts::default();
        self.enrich_level(&mut document, expression.clone(), &mut counts)
            .await?;

        Ok(EnrichedDocument {
            document,
            embedded: counts.embedded,
            failed: counts.failed,
            writes: counts.writes,
        })
    }

    fn enrich_level<'a>(
        &'a self,
        document: &'a mut Value,
        expression: PathExpression,
        counts: &'a mut Counts,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            for found in resolve(document, &expression) {
                match found {
                    Match::Nested { path } => {
                        self.enrich_level(document, path, counts).await?;
                    }
                    scalar @ Match::Scalar { .. } => {
                        self.embed_field(document, &scalar, counts).await?;
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }

    async fn embed_field(
        &self,
        document: &mut Value,
        found: &Match,
        counts: &mut Counts,
    ) -> Result<()> {
        let path = found.path();
        let Some(text) = found.text().filter(|t| !t.trim().is_empty()) else {
            tracing::debug!(path = %path, "skipping blank field");
            return Ok(());
        };
        let target = path
            .embedding_path()
            .ok_or_else(|| ProxyError::document(path, "no field name to suffix"))?;

        tracing::debug!(path = %path, chars = text.len(), "vectorizing field");

        match self.provider.embed(&text).await {
            Ok(embedding) => {
                let vector = Value::from(embedding);
                document::set(document, &target, vector.clone())?;
                counts.embedded += 1;
                counts.writes.push(EmbeddingWrite {
                    path: target,
                    vector,
                });
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Failed to vectorize field");
                counts.failed += 1;
            }
        }
        Ok(())
    }
}
