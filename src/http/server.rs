//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router: `/` serves the demo page, every other path is
//!   dispatched by method (OPTIONS → preflight, GET/POST → cache
//!   orchestrator, anything else → 405)
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve until shutdown, then drain pending cache writes

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::{CacheStore, MemoryStore};
use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::http::request::{request_id, InboundRequest, UuidRequestId};
use crate::http::response::ProxyResponse;
use crate::lifecycle::shutdown::triggered;
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::BackgroundTasks;
use crate::observability::metrics;
use crate::proxy::cors::InvalidPolicy;
use crate::proxy::{CacheOrchestrator, CorsPolicy, Forwarder, HttpForwarder, OrchestratorParts};

const DEMO_PAGE: &str = include_str!("../../assets/index.html");

/// Errors building the server from configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("upstream client: {0}")]
    Upstream(#[from] ProxyError),

    #[error("cors policy: {0}")]
    Cors(#[from] InvalidPolicy),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<CacheOrchestrator>,
    pub scheme: Arc<str>,
    pub fallback_authority: Arc<str>,
    pub max_body_bytes: usize,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    background: BackgroundTasks,
    sweepable: Option<MemoryStore>,
}

impl HttpServer {
    /// Create a server forwarding to `config.upstream` with an in-memory
    /// edge cache.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let forwarder = Arc::new(HttpForwarder::new(&config.upstream)?);
        let store = MemoryStore::new(config.cache.max_entries);
        let mut server = Self::with_components(config, forwarder, Arc::new(store.clone()))?;
        server.sweepable = Some(store);
        Ok(server)
    }

    /// Create a server with caller-supplied collaborators.
    pub fn with_components(
        config: ProxyConfig,
        forwarder: Arc<dyn Forwarder>,
        store: Arc<dyn CacheStore>,
    ) -> Result<Self, ServerError> {
        let background = BackgroundTasks::new();
        let orchestrator = CacheOrchestrator::new(OrchestratorParts {
            forwarder,
            store,
            cors: CorsPolicy::new(&config.cors, config.cache.browser_max_age_secs)?,
            background: background.clone(),
            edge_max_age_secs: config.cache.edge_max_age_secs,
            cache_enabled: config.cache.enabled,
        });

        let state = AppState {
            orchestrator: Arc::new(orchestrator),
            scheme: Arc::from(config.listener.public_scheme.as_str()),
            fallback_authority: Arc::from(config.listener.bind_address.as_str()),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            background,
            sweepable: None,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(demo_page))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Background cache writes scheduled by this server.
    pub fn background(&self) -> &BackgroundTasks {
        &self.background
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Serve on `listener` until Ctrl+C/SIGTERM or `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            "HTTP server starting"
        );

        let sweeper = self.sweepable.clone().map(|store| {
            let every = Duration::from_secs(self.config.cache.sweep_interval_secs.max(1));
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(every);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let removed = store.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = store.len(), "Swept expired cache entries");
                    }
                }
            })
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {},
                    _ = triggered(shutdown) => {},
                }
            })
            .await?;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        let dropped = self
            .background
            .drain(Duration::from_secs(self.config.timeouts.drain_secs))
            .await;
        tracing::info!(dropped_cache_writes = dropped, "HTTP server stopped");
        Ok(())
    }
}

/// Serve the demo page.
async fn demo_page() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html;charset=UTF-8")], DEMO_PAGE)
}

/// Entry point for every non-root path.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    let response = match dispatch(&state, request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            match &e {
                ProxyError::UnsupportedMethod(_) => {
                    tracing::debug!(request_id = %request_id, method = %method, "Method not allowed")
                }
                _ => tracing::warn!(request_id = %request_id, path = %path, error = %e, "Request failed"),
            }
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

/// Route by method. The body is only buffered for methods that are served.
async fn dispatch(state: &AppState, request: Request<Body>) -> ProxyResult<ProxyResponse> {
    if !matches!(*request.method(), Method::OPTIONS | Method::GET | Method::POST) {
        return Err(ProxyError::UnsupportedMethod(request.method().clone()));
    }

    let inbound = InboundRequest::from_request(
        request,
        &state.scheme,
        &state.fallback_authority,
        state.max_body_bytes,
    )
    .await?;

    if *inbound.method() == Method::OPTIONS {
        return Ok(state.orchestrator.preflight(&inbound));
    }
    state.orchestrator.handle(&inbound).await
}
