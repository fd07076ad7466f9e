//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the inbound URL onto the fixed upstream origin (scheme, host and
//!   port change; path and query stay)
//! - Copy method, headers and body; set `Origin` to the upstream's own origin
//! - Return the upstream response unmodified apart from connection framing
//!
//! # Design Decisions
//! - No retries: a failed exchange is reported once as `UpstreamUnreachable`
//! - Upstream 4xx/5xx are responses, not errors
//! - `accept-encoding` is not forwarded so JSON bodies arrive identity-encoded

use axum::http::{header, HeaderName, HeaderValue};
use futures_util::future::BoxFuture;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::http::headers::Headers;
use crate::http::request::InboundRequest;
use crate::http::response::ProxyResponse;
use crate::observability::metrics;

/// Edge-platform response header that must not be re-served.
const CF_CACHE_STATUS: HeaderName = HeaderName::from_static("cf-cache-status");

/// Sends a request to the upstream API.
pub trait Forwarder: Send + Sync {
    fn forward<'a>(&'a self, request: &'a InboundRequest) -> BoxFuture<'a, ProxyResult<ProxyResponse>>;
}

/// Rewrite `url` onto `upstream`'s scheme, host and port.
pub fn upstream_url(url: &Url, upstream: &Url) -> ProxyResult<Url> {
    let mut rewritten = url.clone();
    let invalid = |what: &str| ProxyError::InvalidUpstreamUrl(format!("cannot set {} on {}", what, url));

    rewritten
        .set_scheme(upstream.scheme())
        .map_err(|_| invalid("scheme"))?;
    rewritten
        .set_host(upstream.host_str())
        .map_err(|_| invalid("host"))?;
    rewritten
        .set_port(upstream.port())
        .map_err(|_| invalid("port"))?;
    Ok(rewritten)
}

/// Headers for the outgoing request: inbound headers minus framing and
/// `host`/`accept-encoding`, with `Origin` set to the upstream origin.
pub fn upstream_headers(inbound: &Headers, upstream: &Url) -> ProxyResult<Headers> {
    let origin = HeaderValue::from_str(&upstream.origin().ascii_serialization())
        .map_err(|e| ProxyError::InvalidUpstreamUrl(e.to_string()))?;

    Ok(inbound
        .without_hop_by_hop()
        .without(header::HOST)
        .without(header::ACCEPT_ENCODING)
        .with_set(header::ORIGIN, origin))
}

/// `Forwarder` backed by a pooled reqwest client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
    upstream: Url,
}

impl HttpForwarder {
    pub fn new(config: &UpstreamConfig) -> ProxyResult<Self> {
        let upstream = Url::parse(&config.base_url)
            .map_err(|e| ProxyError::InvalidUpstreamUrl(format!("{}: {}", config.base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyError::UpstreamUnreachable(e.to_string()))?;

        Ok(Self { client, upstream })
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    async fn send(&self, request: &InboundRequest) -> ProxyResult<ProxyResponse> {
        let url = upstream_url(request.url(), &self.upstream)?;
        let headers = upstream_headers(request.headers(), &self.upstream)?;

        let mut builder = self
            .client
            .request(request.method().clone(), url.clone())
            .headers(headers.into_header_map());
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                metrics::record_upstream(None, start);
                tracing::error!(upstream = %url, error = %e, "Upstream request failed");
                return Err(ProxyError::UpstreamUnreachable(e.to_string()));
            }
        };

        let status = response.status();
        let headers = Headers::from(response.headers().clone())
            .without_hop_by_hop()
            .without(CF_CACHE_STATUS);
        let body = response.bytes().await.map_err(|e| {
            metrics::record_upstream(None, start);
            tracing::error!(upstream = %url, error = %e, "Upstream body read failed");
            ProxyError::UpstreamUnreachable(e.to_string())
        })?;

        metrics::record_upstream(Some(status.as_u16()), start);
        tracing::debug!(
            upstream = %url,
            status = %status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        Ok(ProxyResponse::new(status, headers, body))
    }
}

impl Forwarder for HttpForwarder {
    fn forward<'a>(&'a self, request: &'a InboundRequest) -> BoxFuture<'a, ProxyResult<ProxyResponse>> {
        Box::pin(self.send(request))
    }
}
