//! Response model shared by the forwarder, the cache and the client side.
//!
//! # Design Decisions
//! - Bodies are fully buffered: they are hashed, rewritten and stored, never
//!   streamed through
//! - `ProxyResponse` is a plain value; a stored copy and a served copy share
//!   nothing mutable

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::http::headers::Headers;

/// A buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: Headers,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(status: StatusCode, headers: Headers, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// A response with no body.
    pub fn empty(status: StatusCode, headers: Headers) -> Self {
        Self::new(status, headers, Bytes::new())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Same status and body with different headers.
    pub fn with_headers(&self, headers: Headers) -> Self {
        Self {
            status: self.status,
            headers,
            body: self.body.clone(),
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.into_header_map();
        response
    }
}
