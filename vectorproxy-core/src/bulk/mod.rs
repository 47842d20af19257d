//! Bulk enrichment pipeline
//!
//! Splits an NDJSON bulk body into action/document pairs, enriches the
//! documents concurrently and reassembles them in their original order.

pub mod pair;
pub mod pipeline;

pub use pair::{BulkBody, BulkPair};
pub use pipeline::{BulkPipeline, PipelineOutput};
