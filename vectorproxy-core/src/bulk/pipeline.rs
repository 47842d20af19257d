//! Bounded-concurrency bulk enrichment
//!
//! Each pair gets one worker task. Workers are admitted through a semaphore
//! sized by `max_concurrency` and write their result into a slot reserved
//! for their input position, so the output keeps input order whatever order
//! the workers finish in.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::pair::{BulkBody, write_pair};
use crate::config::ProxyConfig;
use crate::embeddings::EmbeddingProvider;
use crate::enrich::{EmbeddingWrite, FieldEnricher};
use crate::error::{ProxyError, Result};
use crate::path::PathExpression;
use crate::path::raw::splice;

/// Result of running the pipeline over one bulk body
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Enriched NDJSON body
    pub body: Bytes,
    /// Wall-clock time spent splitting, enriching and reassembling
    pub elapsed: Duration,
    /// Number of action/document pairs processed
    pub pairs: usize,
    /// Fields that received an embedding
    pub fields_embedded: usize,
    /// Fields whose embedding call failed
    pub fields_failed: usize,
    /// Pairs forwarded unmodified after a structural failure
    pub pairs_unmodified: usize,
}

/// What a worker leaves in its slot
#[derive(Debug)]
struct EnrichedPair {
    /// `None` when the original document bytes should be forwarded
    document: Option<Bytes>,
    embedded: usize,
    failed: usize,
    structural_failure: bool,
}

impl EnrichedPair {
    /// Original bytes go out; embeddings already produced are discarded.
    fn unmodified(failed: usize) -> Self {
        Self {
            document: None,
            embedded: 0,
            failed,
            structural_failure: true,
        }
    }
}

/// Bulk enrichment pipeline
#[derive(Debug, Clone)]
pub struct BulkPipeline {
    enricher: FieldEnricher,
    paths: Arc<[PathExpression]>,
    max_concurrency: usize,
}

impl BulkPipeline {
    /// Create a pipeline.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `max_concurrency` is zero.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        paths: Vec<PathExpression>,
        max_concurrency: usize,
    ) -> Result<Self> {
        if max_concurrency == 0 {
            return Err(ProxyError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            enricher: FieldEnricher::new(provider),
            paths: paths.into(),
            max_concurrency,
        })
    }

    /// Create a pipeline from the proxy configuration.
    pub fn from_config(config: &ProxyConfig, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Self::new(provider, config.path_expressions()?, config.max_concurrency)
    }

    pub fn paths(&self) -> &[PathExpression] {
        &self.paths
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Enrich a bulk body.
    ///
    /// Per-field embedding failures and malformed documents never fail the
    /// batch: the affected field is left alone, or the pair is forwarded as
    /// received. A trailing action without a document is forwarded as is.
    ///
    /// # Errors
    ///
    /// Returns an error only if the admission gate is closed.
    pub async fn process(&self, body: Bytes) -> Result<PipelineOutput> {
        let start = Instant::now();
        let BulkBody { pairs, orphan } = BulkBody::split(&body);
        let pair_count = pairs.len();

        let slots: Arc<[OnceLock<EnrichedPair>]> =
            (0..pair_count).map(|_| OnceLock::new()).collect();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut workers = JoinSet::new();

        if !self.paths.is_empty() {
            for (index, pair) in pairs.iter().enumerate() {
                let permit = semaphore.clone().acquire_owned().await.map_err(|_| {
                    ProxyError::Other("bulk worker admission gate closed".to_string())
                })?;
                let document = pair.document.clone();
                let enricher = self.enricher.clone();
                let paths = self.paths.clone();
                let slots = slots.clone();

                workers.spawn(async move {
                    let enriched = enrich_document(&enricher, &paths, &document).await;
                    // Each index is handed to exactly one worker.
                    let _ = slots[index].set(enriched);
                    drop(permit);
                });
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "bulk worker failed, forwarding its pair unmodified");
            }
        }

        let mut output = Vec::with_capacity(body.len() + pair_count * 64);
        let mut fields_embedded = 0;
        let mut fields_failed = 0;
        let mut pairs_unmodified = 0;

        for (pair, slot) in pairs.iter().zip(slots.iter()) {
            match slot.get() {
                Some(enriched) => {
                    fields_embedded += enriched.embedded;
                    fields_failed += enriched.failed;
                    if enriched.structural_failure {
                        pairs_unmodified += 1;
                    }
                    let document = enriched.document.as_ref().unwrap_or(&pair.document);
                    write_pair(&mut output, &pair.action, document);
                }
                None => {
                    if !self.paths.is_empty() {
                        pairs_unmodified += 1;
                    }
                    pair.write_to(&mut output);
                }
            }
        }

        if let Some(action) = orphan {
            tracing::warn!(
                action = %String::from_utf8_lossy(&action),
                "bulk action line has no document, forwarding it unmodified"
            );
            output.extend_from_slice(&action);
            output.push(b'\n');
        }

        let elapsed = start.elapsed();
        tracing::info!(
            pairs = pair_count,
            fields_embedded,
            fields_failed,
            pairs_unmodified,
            elapsed_ms = elapsed.as_millis() as u64,
            "bulk body enriched"
        );

        Ok(PipelineOutput {
            body: Bytes::from(output),
            elapsed,
            pairs: pair_count,
            fields_embedded,
            fields_failed,
            pairs_unmodified,
        })
    }
}

/// Apply every path expression, in order, to one document.
///
/// Resolution runs on the parsed document so later paths see earlier
/// embeddings. The vectors are then spliced into the original bytes, leaving
/// every other member exactly as the client sent it.
async fn enrich_document(
    enricher: &FieldEnricher,
    paths: &[PathExpression],
    raw: &Bytes,
) -> EnrichedPair {
    let mut document: serde_json::Value = match serde_json::from_slice(raw) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!(error = %e, "bulk document is not valid JSON, forwarding it unmodified");
            return EnrichedPair::unmodified(0);
        }
    };

    let mut embedded = 0;
    let mut failed = 0;
    let mut writes = Vec::new();
    for path in paths {
        match enricher.enrich(document, path).await {
            Ok(enriched) => {
                embedded += enriched.embedded;
                failed += enriched.failed;
                writes.extend(enriched.writes);
                document = enriched.document;
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "cannot enrich document, forwarding it unmodified");
                return EnrichedPair::unmodified(failed);
            }
        }
    }

    if writes.is_empty() {
        return EnrichedPair {
            document: None,
            embedded,
            failed,
            structural_failure: false,
        };
    }

    match splice_writes(raw, &writes) {
        Ok(bytes) => EnrichedPair {
            document: Some(Bytes::from(bytes)),
            embedded,
            failed,
            structural_failure: false,
        },
        Err(e) => {
            tracing::warn!(error = %e, "cannot write embeddings into document, forwarding it unmodified");
            EnrichedPair::unmodified(failed)
        }
    }
}

fn splice_writes(original: &[u8], writes: &[EmbeddingWrite]) -> Result<Vec<u8>> {
    let mut out = original.to_vec();
    for write in writes {
        let vector = serde_json::to_vec(&write.vector)?;
        out = splice(&out, &write.path, &vector)?;
    }
    Ok(out)
}
