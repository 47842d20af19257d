//! # VectorProxy - embeddings at ingest time
//!
//! VectorProxy sits in front of an OpenSearch-compatible `_bulk` API. For every
//! indexed document it computes vector embeddings of the configured text
//! fields, stores each one next to its source as `<field>_embedding`, forwards
//! the enriched bulk body to the store and reports the time spent enriching
//! in the store's response.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vectorproxy_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut config = ProxyConfig::load(None)?;
//!     config.set_paths_csv("title,chapters.#.body");
//!
//!     let provider = EmbeddingProviderFactory::create(&config.embeddings).await?;
//!     vectorproxy_core::proxy::serve(config, provider).await
//! }
//! ```
//!
//! ## Path expressions
//!
//! Fields are selected with dotted paths. `#` matches every element of an
//! array and `\.` escapes a literal dot, so `chapters.#.body` selects the
//! `body` of every chapter and `meta\.title` selects the key `meta.title`.

pub mod bulk;
pub mod config;
pub mod embeddings;
pub mod enrich;
pub mod error;
pub mod path;
pub mod proxy;
pub mod response;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bulk::{BulkBody, BulkPair, BulkPipeline, PipelineOutput};
    pub use crate::config::{EmbeddingsConfig, ProxyConfig};
    pub use crate::embeddings::{EmbeddingProvider, EmbeddingProviderFactory};
    pub use crate::enrich::{EmbeddingWrite, EnrichedDocument, FieldEnricher};
    pub use crate::error::{ProxyError, Result};
    pub use crate::path::{Match, PathExpression, Segment, resolve, resolve_all};
    pub use crate::proxy::{AppState, StoreClient};
    pub use crate::response::ResponseAugmenter;
}
