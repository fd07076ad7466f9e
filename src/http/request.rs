//! Inbound request model and request-ID generation.
//!
//! # Responsibilities
//! - Buffer an Axum request into an immutable `InboundRequest`
//! - Reconstruct the absolute URL the browser addressed
//! - Generate a UUID `x-request-id` for tracing
//!
//! # Design Decisions
//! - The body is held as `Bytes`: hashing it for the cache key and forwarding
//!   it upstream both read the same buffer, neither consumes it
//! - Nothing on the request path mutates an `InboundRequest`; rewrites build
//!   new values

use axum::{
    body::Body,
    http::{header, request::Parts, uri::Authority, HeaderValue, Method, Request},
};
use bytes::Bytes;
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

use crate::error::{ProxyError, ProxyResult};
use crate::http::headers::Headers;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A fully buffered request as received from the browser.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Bytes>,
}

impl InboundRequest {
    pub fn new(method: Method, url: Url, headers: Headers, body: Option<Bytes>) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// Buffer an Axum request.
    ///
    /// The URL authority comes from the `Host` header, or `fallback_authority`
    /// when the client sent none. Bodies larger than `max_body_bytes` fail with
    /// `BodyTooLarge`; an empty body is kept only for POST.
    pub async fn from_request(
        request: Request<Body>,
        scheme: &str,
        fallback_authority: &str,
        max_body_bytes: usize,
    ) -> ProxyResult<Self> {
        let (parts, body) = request.into_parts();
        let url = absolute_url(&parts, scheme, fallback_authority)?;
        let bytes = axum::body::to_bytes(body, max_body_bytes)
            .await
            .map_err(|_| ProxyError::BodyTooLarge)?;

        let body = if parts.method == Method::POST || !bytes.is_empty() {
            Some(bytes)
        } else {
            None
        };

        Ok(Self {
            method: parts.method,
            url,
            headers: Headers::from(parts.headers),
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Request body; reading it never consumes it.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}

/// Host and port only. Anything that could move the path, query or userinfo
/// is rejected.
fn parse_authority(raw: &str) -> ProxyResult<Authority> {
    raw.parse::<Authority>()
        .ok()
        .filter(|authority| !authority.as_str().contains('@'))
        .ok_or_else(|| ProxyError::InvalidRequest(format!("Invalid host: {:?}", raw)))
}

fn absolute_url(parts: &Parts, scheme: &str, fallback_authority: &str) -> ProxyResult<Url> {
    let raw = parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()))
        .unwrap_or(fallback_authority);
    let authority = parse_authority(raw)?;
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Url::parse(&format!("{}://{}{}", scheme, authority, path_and_query))
        .map_err(|e| ProxyError::InvalidRequest(format!("Invalid request URL: {}", e)))
}

/// Generates UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of a request that went through `SetRequestIdLayer`.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
