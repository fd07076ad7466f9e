//! Cache orchestration for GET and POST.
//!
//! ```text
//! START → KEY_DERIVED → CACHE_HIT ───────────────────────────────┐
//!                     → CACHE_MISS → FORWARDED → NORMALIZED ─────┤
//!                                      (2xx: STORED in background)│
//!                                                                ▼
//!                                                   DECORATED → DONE
//! ```

use std::sync::Arc;

use crate::cache::{derive_key, CacheKey, CacheStore};
use crate::error::ProxyResult;
use crate::http::request::InboundRequest;
use crate::http::response::ProxyResponse;
use crate::lifecycle::BackgroundTasks;
use crate::observability::metrics;
use crate::proxy::cors::CorsPolicy;
use crate::proxy::forwarder::Forwarder;
use crate::proxy::normalizer::normalize;

/// Collaborators and policy for `CacheOrchestrator`.
pub struct OrchestratorParts {
    pub forwarder: Arc<dyn Forwarder>,
    pub store: Arc<dyn CacheStore>,
    pub cors: CorsPolicy,
    pub background: BackgroundTasks,
    pub edge_max_age_secs: u64,
    pub cache_enabled: bool,
}

/// Serves GET/POST from the cache, falling back to the upstream API.
pub struct CacheOrchestrator {
    forwarder: Arc<dyn Forwarder>,
    store: Arc<dyn CacheStore>,
    cors: CorsPolicy,
    background: BackgroundTasks,
    edge_max_age_secs: u64,
    cache_enabled: bool,
}

impl CacheOrchestrator {
    pub fn new(parts: OrchestratorParts) -> Self {
        Self {
            forwarder: parts.forwarder,
            store: parts.store,
            cors: parts.cors,
            background: parts.background,
            edge_max_age_secs: parts.edge_max_age_secs,
            cache_enabled: parts.cache_enabled,
        }
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    /// Handle a GET or POST. Any other method fails with `UnsupportedMethod`
    /// before the cache or upstream is touched.
    pub async fn handle(&self, request: &InboundRequest) -> ProxyResult<ProxyResponse> {
        let key = derive_key(request)?;

        let cached = if self.cache_enabled {
            let hit = self.store.lookup(&key).await;
            metrics::record_cache_lookup(hit.is_some());
            hit
        } else {
            None
        };

        let response = match cached {
            Some(hit) => {
                tracing::debug!(key = %key, status = %hit.status, "Cache hit");
                hit
            }
            None => {
                tracing::debug!(key = %key, "Cache miss");
                let raw = self.forwarder.forward(request).await?;
                let normalized = normalize(&raw, request.url(), self.edge_max_age_secs);
                if self.cache_enabled && normalized.is_success() {
                    self.persist(key, normalized.clone());
                }
                normalized
            }
        };

        Ok(self.cors.decorate(&response, request.is_get()))
    }

    /// Answer an OPTIONS request.
    pub fn preflight(&self, request: &InboundRequest) -> ProxyResponse {
        self.cors.preflight(request.headers())
    }

    /// Store `response` without making the caller wait.
    fn persist(&self, key: CacheKey, response: ProxyResponse) {
        let store = self.store.clone();
        self.background.spawn("cache_put", async move {
            match store.put(key.clone(), response).await {
                Ok(()) => {
                    metrics::record_cache_write("stored");
                    tracing::debug!(key = %key, "Cached response");
                }
                Err(e) => {
                    metrics::record_cache_write("rejected");
                    tracing::warn!(key = %key, error = %e, "Cache write dropped");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::config::CorsConfig;
    use crate::error::ProxyError;
    use crate::http::headers::Headers;
    use bytes::Bytes;
    use axum::http::{header, HeaderValue, Method, StatusCode};
    use futures_util::future::BoxFuture;
    use serde_json::{json, Value};
    use ::metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, SharedString, Unit};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use url::Url;

    /// Upstream stand-in that counts calls and records what it was sent.
    struct FakeUpstream {
        calls: AtomicUsize,
        status: StatusCode,
        body: &'static str,
        seen_bodies: Mutex<Vec<Option<Bytes>>>,
        fail: bool,
    }

    impl FakeUpstream {
        fn new(status: StatusCode, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                status,
                body,
                seen_bodies: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                status: StatusCode::OK,
                body: "",
                seen_bodies: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Forwarder for FakeUpstream {
        fn forward<'a>(
            &'a self,
            request: &'a InboundRequest,
        ) -> BoxFuture<'a, ProxyResult<ProxyResponse>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.seen_bodies.lock().unwrap().push(request.body().cloned());
                if self.fail {
                    return Err(ProxyError::UpstreamUnreachable("connection refused".into()));
                }
                Ok(ProxyResponse::new(
                    self.status,
                    Headers::from([(header::SET_COOKIE, HeaderValue::from_static("sid=1"))]),
                    self.body,
                ))
            })
        }
    }

    struct Harness {
        upstream: Arc<FakeUpstream>,
        store: MemoryStore,
        background: BackgroundTasks,
        orchestrator: CacheOrchestrator,
    }

    fn harness(upstream: Arc<FakeUpstream>) -> Harness {
        let store = MemoryStore::new(100);
        let background = BackgroundTasks::new();
        let orchestrator = CacheOrchestrator::new(OrchestratorParts {
            forwarder: upstream.clone(),
            store: Arc::new(store.clone()),
            cors: CorsPolicy::new(&CorsConfig::default(), 86400).unwrap(),
            background: background.clone(),
            edge_max_age_secs: 86400,
            cache_enabled: true,
        });
        Harness {
            upstream,
            store,
            background,
            orchestrator,
        }
    }

    fn get(path: &str) -> InboundRequest {
        let url = Url::parse("https://proxy.example.com").unwrap().join(path).unwrap();
        InboundRequest::new(Method::GET, url, Headers::new(), None)
    }

    fn post(path: &str, body: &'static str) -> InboundRequest {
        let url = Url::parse("https://proxy.example.com").unwrap().join(path).unwrap();
        InboundRequest::new(Method::POST, url, Headers::new(), Some(Bytes::from_static(body.as_bytes())))
    }

    const SERIES: &str = r#"{"status":"REQUEST_SUCCEEDED","Results":{"series":[{"data":[{"year":"2020","value":"3.5","latest":"true"}]}]}}"#;

    #[tokio::test]
    async fn test_second_get_is_served_from_cache() {
        let h = harness(FakeUpstream::new(StatusCode::OK, SERIES));
        let request = get("/publicAPI/v2/timeseries/data/CUUR0000SA0");

        let first = h.orchestrator.handle(&request).await.unwrap();
        h.background.drain(Duration::from_secs(1)).await;
        let second = h.orchestrator.handle(&request).await.unwrap();

        assert_eq!(h.upstream.calls(), 1);
        assert_eq!(first, second);
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_miss_response_is_normalized_and_decorated() {
        let h = harness(FakeUpstream::new(StatusCode::OK, SERIES));
        let response = h.orchestrator.handle(&get("/series")).await.unwrap();

        assert!(!response.headers.contains(header::SET_COOKIE));
        assert_eq!(response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
        assert_eq!(response.headers.get_all(header::VARY), vec!["Origin"]);
        assert_eq!(
            response.headers.get_all(header::CACHE_CONTROL),
            vec!["s-maxage=86400", "max-age=86400"]
        );
        assert_eq!(response.headers.get(header::CONTENT_TYPE), Some("application/json"));

        let body: Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["Results"]["series"][0]["data"][0]["year"], json!(2020));
    }

    #[tokio::test]
    async fn test_stored_copy_has_no_browser_headers() {
        let h = harness(FakeUpstream::new(StatusCode::OK, SERIES));
        let request = get("/series");
        h.orchestrator.handle(&request).await.unwrap();
        h.background.drain(Duration::from_secs(1)).await;

        let key = derive_key(&request).unwrap();
        let stored = h.store.lookup(&key).await.unwrap();
        assert_eq!(stored.headers.get_all(header::CACHE_CONTROL), vec!["s-maxage=86400"]);
        assert!(!stored.headers.contains(header::VARY));
        assert!(!stored.headers.contains(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_post_cached_by_body() {
        let h = harness(FakeUpstream::new(StatusCode::OK, SERIES));
        let data = "/publicAPI/v2/timeseries/data/";

        let response = h.orchestrator.handle(&post(data, r#"{"seriesid":["A"]}"#)).await.unwrap();
        h.background.drain(Duration::from_secs(1)).await;
        h.orchestrator.handle(&post(data, r#"{"seriesid":["A"]}"#)).await.unwrap();
        assert_eq!(h.upstream.calls(), 1);

        h.orchestrator.handle(&post(data, r#"{"seriesid":["B"]}"#)).await.unwrap();
        assert_eq!(h.upstream.calls(), 2);

        // POST responses get no browser max-age.
        assert_eq!(response.headers.get_all(header::CACHE_CONTROL), vec!["s-maxage=86400"]);
    }

    #[tokio::test]
    async fn test_post_body_reaches_upstream_after_hashing() {
        let h = harness(FakeUpstream::new(StatusCode::OK, SERIES));
        h.orchestrator.handle(&post("/data", "payload")).await.unwrap();

        let seen = h.upstream.seen_bodies.lock().unwrap().clone();
        assert_eq!(seen, vec![Some(Bytes::from_static(b"payload"))]);
    }

    #[tokio::test]
    async fn test_error_status_passes_through_uncached() {
        let h = harness(FakeUpstream::new(StatusCode::SERVICE_UNAVAILABLE, "busy"));
        let request = get("/series");

        let response = h.orchestrator.handle(&request).await.unwrap();
        h.background.drain(Duration::from_secs(1)).await;
        h.orchestrator.handle(&request).await.unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body.as_ref(), b"busy");
        assert_eq!(response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN), Some("*"));
        assert_eq!(h.upstream.calls(), 2);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_reported_once() {
        let h = harness(FakeUpstream::unreachable());
        let err = h.orchestrator.handle(&get("/series")).await.unwrap_err();

        assert!(matches!(err, ProxyError::UpstreamUnreachable(_)));
        assert_eq!(h.upstream.calls(), 1);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_other_methods() {
        let h = harness(FakeUpstream::new(StatusCode::OK, SERIES));
        let url = Url::parse("https://proxy.example.com/series").unwrap();
        let request = InboundRequest::new(Method::PUT, url, Headers::new(), None);

        let err = h.orchestrator.handle(&request).await.unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedMethod(_)));
        assert_eq!(h.upstream.calls(), 0);
    }

    fn orchestrator(upstream: Arc<FakeUpstream>, cache_enabled: bool) -> CacheOrchestrator {
        CacheOrchestrator::new(OrchestratorParts {
            forwarder: upstream,
            store: Arc::new(MemoryStore::new(10)),
            cors: CorsPolicy::new(&CorsConfig::default(), 86400).unwrap(),
            background: BackgroundTasks::new(),
            edge_max_age_secs: 86400,
            cache_enabled,
        })
    }

    #[tokio::test]
    async fn test_cache_disabled_always_forwards() {
        let upstream = FakeUpstream::new(StatusCode::OK, SERIES);
        let orchestrator = orchestrator(upstream.clone(), false);
        let background = orchestrator.background.clone();

        let request = get("/series");
        orchestrator.handle(&request).await.unwrap();
        background.drain(Duration::from_secs(1)).await;
        orchestrator.handle(&request).await.unwrap();
        assert_eq!(upstream.calls(), 2);
    }

    /// Counts `proxy_cache_lookups_total` increments, ignores everything else.
    #[derive(Default)]
    struct LookupCounter {
        lookups: Arc<AtomicU64>,
    }

    impl ::metrics::Recorder for LookupCounter {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            if key.name() == "proxy_cache_lookups_total" {
                Counter::from_arc(self.lookups.clone())
            } else {
                Counter::noop()
            }
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    fn lookups_recorded(cache_enabled: bool) -> u64 {
        let recorder = LookupCounter::default();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let orchestrator = orchestrator(FakeUpstream::new(StatusCode::OK, SERIES), cache_enabled);

        ::metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                orchestrator.handle(&get("/series")).await.unwrap();
                orchestrator.handle(&get("/series")).await.unwrap();
            })
        });
        recorder.lookups.load(Ordering::SeqCst)
    }

    #[test]
    fn test_lookup_metric_only_counts_consulted_store() {
        assert_eq!(lookups_recorded(true), 2);
        assert_eq!(lookups_recorded(false), 0);
    }
}
