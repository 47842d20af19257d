//! Bulk endpoint: enrich, forward, patch the response

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;

use super::{AppState, dry_run_response, respond, store};
use crate::error::{ProxyError, Result};

/// Handle `POST {mount}/_bulk` and `POST {mount}/{index}/_bulk`.
///
/// The enriched body goes to the store at the same path; the store's answer
/// is returned with the pipeline latency added. In dry-run mode the enriched
/// body itself is returned and nothing is forwarded.
pub async fn bulk_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response> {
    if method != Method::POST {
        return Err(ProxyError::MethodNotAllowed(method.to_string()));
    }

    let body = state.read_body(body).await?;
    let output = state.pipeline.process(body).await?;

    if state.config.dry_run {
        tracing::info!(
            url = %state.store.url_for(&uri),
            pairs = output.pairs,
            "dry run, not sending request"
        );
        return Ok(dry_run_response(&headers, output.body));
    }

    let response = state
        .store
        .send(
            Method::POST,
            &uri,
            &store::identity_encoded(&headers),
            output.body,
        )
        .await?;
    let status = response.status();
    let response_headers = store::response_headers(response.headers());
    let response_body = response
        .bytes()
        .await
        .inspect_err(|e| tracing::error!(error = %e, "failed to read store response"))?;

    let patched = state.augmenter.augment(response_body, output.elapsed);
    Ok(respond(status, response_headers, Body::from(patched)))
}
