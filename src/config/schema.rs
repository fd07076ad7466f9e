//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, public scheme).
    pub listener: ListenerConfig,

    /// The third-party API requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Edge and browser cache lifetimes.
    pub cache: CacheConfig,

    /// Cross-origin policy applied to every response.
    pub cors: CorsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,

    /// Scheme used when reconstructing the inbound URL ("http" or "https").
    pub public_scheme: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
            public_scheme: "http".to_string(),
        }
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme, host and optional port replacing the inbound authority.
    pub base_url: String,

    /// Total time allowed for one upstream exchange, in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bls.gov".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disable to always forward (responses are still normalized and decorated).
    pub enabled: bool,

    /// Shared-cache freshness written as `s-maxage`.
    pub edge_max_age_secs: u64,

    /// Browser freshness written as `max-age` on GET responses.
    pub browser_max_age_secs: u64,

    /// Upper bound on entries held by the in-memory store.
    pub max_entries: usize,

    /// How often expired entries are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            edge_max_age_secs: 86_400,
            browser_max_age_secs: 86_400,
            max_entries: 10_000,
            sweep_interval_secs: 60,
        }
    }
}

/// CORS policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `Access-Control-Allow-Origin` value.
    pub allow_origin: String,

    /// `Access-Control-Allow-Methods` value for preflight responses.
    pub allow_methods: String,

    /// `Access-Control-Max-Age` for preflight responses, in seconds.
    pub max_age_secs: u64,

    /// `Allow` value for non-preflight OPTIONS requests.
    pub allow: String,

    /// Value appended to `Vary` on every proxied response.
    pub vary: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET,POST,OPTIONS".to_string(),
            max_age_secs: 86_400,
            allow: "GET, POST, OPTIONS".to_string(),
            vary: "Origin".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// How long shutdown waits for pending cache writes, in seconds.
    pub drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            drain_secs: 5,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.upstream.base_url, "https://api.bls.gov");
        assert_eq!(config.cache.edge_max_age_secs, 86_400);
        assert_eq!(config.cors.allow_methods, "GET,POST,OPTIONS");
        assert_eq!(config.cors.allow, "GET, POST, OPTIONS");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            base_url = "http://127.0.0.1:3000"

            [cache]
            edge_max_age_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.upstream.timeout_secs, 30);
        assert_eq!(config.cache.edge_max_age_secs, 60);
        assert_eq!(config.cache.browser_max_age_secs, 86_400);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8787");
    }
}
