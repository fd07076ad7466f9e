//! Immutable header mapping.
//!
//! Every edit returns a new `Headers`, so a response handed to the cache and
//! the copy returned to the caller can never alias each other's headers.
//! Names are case-insensitive; multiple values for one name keep their order.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Headers that only describe a single connection hop.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::TRANSFER_ENCODING,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
];

/// Ordered, multi-valued, copy-on-write header mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    inner: HeaderMap,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`, if it is valid visible ASCII.
    pub fn get(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.inner.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values for `name`, in insertion order.
    pub fn get_all(&self, name: impl header::AsHeaderName) -> Vec<&str> {
        self.inner
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn contains(&self, name: impl header::AsHeaderName) -> bool {
        self.inner.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.inner.iter()
    }

    /// Replace every value of `name` with `value`.
    pub fn with_set(&self, name: HeaderName, value: HeaderValue) -> Self {
        let mut inner = self.inner.clone();
        inner.insert(name, value);
        Self { inner }
    }

    /// Add `value` after any existing values of `name`.
    pub fn with_appended(&self, name: HeaderName, value: HeaderValue) -> Self {
        let mut inner = self.inner.clone();
        inner.append(name, value);
        Self { inner }
    }

    /// Drop every value of `name`.
    pub fn without(&self, name: impl header::AsHeaderName) -> Self {
        let mut inner = self.inner.clone();
        inner.remove(name);
        Self { inner }
    }

    /// Append every value of `other` after the values already present.
    pub fn merged(&self, other: &Headers) -> Self {
        let mut inner = self.inner.clone();
        for (name, value) in other.inner.iter() {
            inner.append(name.clone(), value.clone());
        }
        Self { inner }
    }

    /// Drop hop-by-hop headers and `content-length`; the body is re-framed on
    /// each side of the proxy.
    pub fn without_hop_by_hop(&self) -> Self {
        let mut inner = self.inner.clone();
        for name in HOP_BY_HOP.iter() {
            inner.remove(name);
        }
        inner.remove(header::CONTENT_LENGTH);
        Self { inner }
    }

    pub fn as_header_map(&self) -> &HeaderMap {
        &self.inner
    }

    pub fn into_header_map(self) -> HeaderMap {
        self.inner
    }
}

impl From<HeaderMap> for Headers {
    fn from(inner: HeaderMap) -> Self {
        Self { inner }
    }
}

impl<const N: usize> From<[(HeaderName, HeaderValue); N]> for Headers {
    fn from(pairs: [(HeaderName, HeaderValue); N]) -> Self {
        let mut inner = HeaderMap::with_capacity(N);
        for (name, value) in pairs {
            inner.append(name, value);
        }
        Self { inner }
    }
}
