//! Error taxonomy for the request path.
//!
//! Every variant maps to exactly one client-facing status code. Background
//! cache writes never produce a `ProxyError` visible to the caller.

use axum::{
    body::Body,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors surfaced synchronously to the original caller.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Method has no cache key / no handler.
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(Method),

    /// Network-level failure reaching the upstream API host.
    #[error("Upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The inbound URL could not be rewritten onto the upstream host.
    #[error("Invalid upstream URL: {0}")]
    InvalidUpstreamUrl(String),

    /// Request body exceeded the configured limit.
    #[error("Request body too large")]
    BodyTooLarge,

    /// Request could not be turned into an `InboundRequest`.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for the request path.
pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    /// Status code this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::UpstreamUnreachable(_) | ProxyError::InvalidUpstreamUrl(_) => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ProxyError::UnsupportedMethod(_) => Body::empty(),
            ProxyError::UpstreamUnreachable(_) | ProxyError::InvalidUpstreamUrl(_) => {
                Body::from("Upstream request failed")
            }
            ProxyError::BodyTooLarge => Body::from("Request body too large"),
            ProxyError::InvalidRequest(msg) => Body::from(msg),
        };
        (status, body).into_response()
    }
}
