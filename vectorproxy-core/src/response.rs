//! Injecting proxy-side ingest latency into store responses

use std::time::Duration;

use bytes::Bytes;
use serde::de::IgnoredAny;

use crate::path::raw::splice;
use crate::path::{PathExpression, Segment};

/// Adds the pipeline latency to the downstream bulk response
#[derive(Debug, Clone)]
pub struct ResponseAugmenter {
    field: String,
}

impl Default for ResponseAugmenter {
    fn default() -> Self {
        Self::new("ingest_took")
    }
}

impl ResponseAugmenter {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Set the latency field (milliseconds) at the top level of `body`.
    ///
    /// An existing value is overwritten and the rest of the body is kept
    /// byte for byte. Bodies that are not a JSON object come back unchanged.
    pub fn augment(&self, body: Bytes, elapsed: Duration) -> Bytes {
        if let Err(e) = serde_json::from_slice::<IgnoredAny>(&body) {
            tracing::warn!(error = %e, field = %self.field, "store response is not JSON, leaving it unpatched");
            return body;
        }

        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let path = PathExpression::from_segments(vec![Segment::Key(self.field.clone())]);

        match splice(&body, &path, millis.to_string().as_bytes()) {
            Ok(patched) => Bytes::from(patched),
            Err(e) => {
                tracing::warn!(error = %e, field = %self.field, "store response is not a JSON object, leaving it unpatched");
                body
            }
        }
    }
}
