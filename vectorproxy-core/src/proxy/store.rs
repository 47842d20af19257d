//! HTTP client for the downstream document store

use axum::http::header::{
    ACCEPT_ENCODING, AUTHORIZATION, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, HOST, PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderName, Method, Uri};
use bytes::Bytes;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};

/// Headers that only make sense on a single hop
static HOP_BY_HOP: [HeaderName; 8] = [
    CONNECTION,
    HeaderName::from_static("keep-alive"),
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Client forwarding requests to the store under the original request URI
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    /// Create a client from configuration.
    ///
    /// Redirects are passed back to the caller rather than followed.
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.store_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                ProxyError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.store_url.trim_end_matches('/').to_string(),
        })
    }

    /// Downstream URL for an inbound request URI (path and query kept).
    pub fn url_for(&self, uri: &Uri) -> String {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        format!("{}{}", self.base_url, path_and_query)
    }

    /// Send a request to the store.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] if the store cannot be reached.
    pub async fn send(
        &self,
        method: Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<reqwest::Response> {
        let url = self.url_for(uri);
        tracing::debug!(%method, url = %url, bytes = body.len(), "forwarding request to store");

        let response = self
            .client
            .request(method, &url)
            .headers(request_headers(headers))
            .body(body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(url = %url, error = %e, "store request failed"))?;

        Ok(response)
    }
}

/// Inbound headers worth forwarding: everything but hop-by-hop headers,
/// `Host` and `Content-Length` (the body may have changed size).
pub fn request_headers(headers: &HeaderMap) -> HeaderMap {
    filtered(headers, &[HOST, CONTENT_LENGTH])
}

/// Headers for a forward whose response body is rewritten before it goes
/// back: `Accept-Encoding` is dropped so the store answers uncompressed.
pub fn identity_encoded(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();
    headers.remove(ACCEPT_ENCODING);
    headers
}

/// Store response headers worth returning to the caller.
pub fn response_headers(headers: &HeaderMap) -> HeaderMap {
    filtered(headers, &[CONTENT_LENGTH])
}

/// Headers echoed on dry-run responses so callers can check what would
/// have been forwarded.
pub fn echo_headers(headers: &HeaderMap) -> HeaderMap {
    let mut echoed = HeaderMap::new();
    for name in [CONTENT_TYPE, AUTHORIZATION] {
        for value in headers.get_all(&name) {
            echoed.append(name.clone(), value.clone());
        }
    }
    echoed
}

fn filtered(headers: &HeaderMap, extra: &[HeaderName]) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if HOP_BY_HOP.contains(name) || extra.contains(name) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}
