//! Forwarding of every non-bulk request under the mount point

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use super::{AppState, dry_run_response, respond, store};
use crate::error::Result;

/// Forward the request unchanged and stream the store's response back.
///
/// Paths outside the mount point get a 404. In dry-run mode the request body
/// is answered locally.
pub async fn passthrough_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Body,
) -> Result<Response> {
    if !state.is_mounted(uri.path()) {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    let body = state.read_body(body).await?;

    if state.config.dry_run {
        tracing::info!(%method, url = %state.store.url_for(&uri), "dry run, not forwarding request");
        return Ok(dry_run_response(&headers, body));
    }

    let response = state.store.send(method, &uri, &headers, body).await?;
    let status = response.status();
    let response_headers = store::response_headers(response.headers());

    Ok(respond(
        status,
        response_headers,
        Body::from_stream(response.bytes_stream()),
    ))
}
