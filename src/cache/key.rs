//! Cache-key derivation.
//!
//! GET requests are keyed by their own URL. POST requests are content
//! addressed: the key is the request URL with its path rewritten to
//! `/posts<path><sha256(body) as lowercase hex>`, so URL-indexed stores can
//! hold them too. Only the body bytes enter the digest; headers never do.

use axum::http::Method;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{ProxyError, ProxyResult};
use crate::http::request::InboundRequest;

/// Path prefix of synthetic POST keys.
pub const POST_KEY_PREFIX: &str = "/posts";

/// URL-shaped identifier a response is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn body_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Derive the cache key for a GET or POST request.
///
/// The body is only borrowed; it stays readable for forwarding.
pub fn derive_key(request: &InboundRequest) -> ProxyResult<CacheKey> {
    match *request.method() {
        Method::GET => Ok(CacheKey(request.url().to_string())),
        Method::POST => {
            let digest = body_digest(request.body().map(|b| b.as_ref()).unwrap_or_default());
            let mut url = request.url().clone();
            let path = format!("{}{}{}", POST_KEY_PREFIX, url.path(), digest);
            url.set_path(&path);
            Ok(CacheKey(url.to_string()))
        }
        ref other => Err(ProxyError::UnsupportedMethod(other.clone())),
    }
}
