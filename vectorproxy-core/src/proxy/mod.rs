//! HTTP surface of the proxy
//!
//! Bulk requests under the mount point go through the enrichment pipeline;
//! every other request under it is forwarded to the store as received.

pub mod bulk;
pub mod passthrough;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{any, get};
use bytes::Bytes;
use tower_http::trace::TraceLayer;

use crate::bulk::BulkPipeline;
use crate::config::ProxyConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::{ProxyError, Result};
use crate::response::ResponseAugmenter;

pub use store::StoreClient;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub pipeline: Arc<BulkPipeline>,
    pub store: StoreClient,
    pub augmenter: Arc<ResponseAugmenter>,
}

impl AppState {
    /// Validate the configuration and build the pipeline and store client.
    pub fn new(config: ProxyConfig, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        config.validate()?;
        let pipeline = BulkPipeline::from_config(&config, provider)?;
        let store = StoreClient::new(&config)?;
        let augmenter = ResponseAugmenter::new(config.latency_field.clone());

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            store,
            augmenter: Arc::new(augmenter),
        })
    }

    /// Mount point without a trailing slash ("" when mounted at the root).
    fn mount(&self) -> &str {
        self.config.mount_path.trim_end_matches('/')
    }

    /// True when `path` lies under the mount point.
    pub fn is_mounted(&self, path: &str) -> bool {
        let mount = self.mount();
        mount.is_empty()
            || path == mount
            || path.strip_prefix(mount).is_some_and(|rest| rest.starts_with('/'))
    }

    async fn read_body(&self, body: Body) -> Result<Bytes> {
        axum::body::to_bytes(body, self.config.max_body_size)
            .await
            .map_err(|e| ProxyError::ReadBody(e.to_string()))
    }
}

/// Build the proxy router.
pub fn router(state: AppState) -> Router {
    let mount = state.mount().to_string();

    Router::new()
        .route("/healthz", get(healthz))
        .route(&format!("{mount}/_bulk"), any(bulk::bulk_handler))
        .route(&format!("{mount}/:index/_bulk"), any(bulk::bulk_handler))
        .fallback(passthrough::passthrough_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the proxy until interrupted.
pub async fn serve(config: ProxyConfig, provider: Arc<dyn EmbeddingProvider>) -> Result<()> {
    let state = AppState::new(config, provider)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        store = %state.config.store_url,
        mount = %state.config.mount_path,
        paths = ?state.config.paths,
        dry_run = state.config.dry_run,
        max_concurrency = state.config.max_concurrency,
        "Starting vector proxy"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("vector proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn healthz() -> &'static str {
    "ok"
}

/// Dry-run answer: 200 with `body` and the echoed request headers.
fn dry_run_response(request_headers: &HeaderMap, body: Bytes) -> Response {
    respond(StatusCode::OK, store::echo_headers(request_headers), Body::from(body))
}

fn respond(status: StatusCode, headers: HeaderMap, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as ProxyResult;
    use async_trait::async_trait;

    struct NoopProvider;

    #[async_trait]
    impl EmbeddingProvider for NoopProvider {
        async fn embed(&self, _text: &str) -> ProxyResult<Vec<f32>> {
            Ok(vec![0.0])
        }

        fn dimension(&self) -> usize {
            1
        }

        fn model(&self) -> &str {
            "noop"
        }
    }

    fn state(mount: &str) -> AppState {
        let config = ProxyConfig {
            mount_path: mount.to_string(),
            ..Default::default()
        };
        AppState::new(config, Arc::new(NoopProvider)).unwrap()
    }

    #[test]
    fn test_is_mounted() {
        let state = state("/opensearch");
        assert!(state.is_mounted("/opensearch"));
        assert!(state.is_mounted("/opensearch/_search"));
        assert!(!state.is_mounted("/opensearchx/_search"));
        assert!(!state.is_mounted("/other"));
    }

    #[test]
    fn test_root_mount_accepts_everything() {
        let state = state("/");
        assert!(state.is_mounted("/anything/at/all"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ProxyConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(AppState::new(config, Arc::new(NoopProvider)).is_err());
    }
}
