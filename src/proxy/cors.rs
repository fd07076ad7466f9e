//! Cross-origin envelope.
//!
//! # Responsibilities
//! - Answer `OPTIONS`: a full preflight (Origin, Access-Control-Request-Method
//!   and Access-Control-Request-Headers all present) gets the CORS grant,
//!   anything else gets a bare `Allow`
//! - Decorate every proxied response with `Access-Control-Allow-Origin` and
//!   `Vary`, plus a browser `max-age` for GET
//!
//! # Design Decisions
//! - Requested headers are echoed back verbatim (accept-all policy)
//! - `Vary` and `Cache-Control` are appended, never replaced, so upstream
//!   values and the edge `s-maxage` survive

use axum::http::{header, HeaderValue, StatusCode};

use crate::config::CorsConfig;
use crate::http::headers::Headers;
use crate::http::response::ProxyResponse;

/// Header values resolved once from configuration.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    max_age: HeaderValue,
    allow: HeaderValue,
    vary: HeaderValue,
    browser_cache_control: HeaderValue,
}

/// A header value from configuration that is not a legal header value.
#[derive(Debug, thiserror::Error)]
#[error("invalid header value for {field}: {value:?}")]
pub struct InvalidPolicy {
    pub field: &'static str,
    pub value: String,
}

fn value(field: &'static str, raw: String) -> Result<HeaderValue, InvalidPolicy> {
    HeaderValue::from_str(&raw).map_err(|_| InvalidPolicy { field, value: raw })
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig, browser_max_age_secs: u64) -> Result<Self, InvalidPolicy> {
        Ok(Self {
            allow_origin: value("cors.allow_origin", config.allow_origin.clone())?,
            allow_methods: value("cors.allow_methods", config.allow_methods.clone())?,
            max_age: value("cors.max_age_secs", config.max_age_secs.to_string())?,
            allow: value("cors.allow", config.allow.clone())?,
            vary: value("cors.vary", config.vary.clone())?,
            browser_cache_control: value(
                "cache.browser_max_age_secs",
                format!("max-age={}", browser_max_age_secs),
            )?,
        })
    }

    /// Answer an `OPTIONS` request carrying `request_headers`.
    pub fn preflight(&self, request_headers: &Headers) -> ProxyResponse {
        let requested_headers = request_headers
            .as_header_map()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS);
        let is_preflight = request_headers.contains(header::ORIGIN)
            && request_headers.contains(header::ACCESS_CONTROL_REQUEST_METHOD);

        match requested_headers {
            Some(requested) if is_preflight => ProxyResponse::empty(
                StatusCode::NO_CONTENT,
                Headers::from([
                    (header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone()),
                    (header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone()),
                    (header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone()),
                    (header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone()),
                ]),
            ),
            _ => ProxyResponse::empty(
                StatusCode::OK,
                Headers::from([(header::ALLOW, self.allow.clone())]),
            ),
        }
    }

    /// Add the cross-origin headers to `response`.
    pub fn decorate(&self, response: &ProxyResponse, is_get: bool) -> ProxyResponse {
        let mut headers = response
            .headers
            .with_set(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone())
            .with_appended(header::VARY, self.vary.clone());
        if is_get {
            headers = headers.with_appended(header::CACHE_CONTROL, self.browser_cache_control.clone());
        }
        response.with_headers(headers)
    }
}
