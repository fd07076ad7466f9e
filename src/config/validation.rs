//! Configuration validation.
//!
//! Serde handles syntax; this module checks that values make sense together.
//! All problems are collected, not just the first.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("listener.public_scheme must be http or https, got '{0}'")]
    PublicScheme(String),

    #[error("upstream.base_url '{0}' must be an absolute http(s) URL with a host")]
    UpstreamUrl(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("cors.allow_methods must not be empty")]
    EmptyMethods,

    #[error("observability.log_format must be pretty or json, got '{0}'")]
    LogFormat(String),
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if !matches!(config.listener.public_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::PublicScheme(config.listener.public_scheme.clone()));
    }

    let upstream_ok = Url::parse(&config.upstream.base_url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false);
    if !upstream_ok {
        errors.push(ValidationError::UpstreamUrl(config.upstream.base_url.clone()));
    }

    let positive = [
        ("upstream.timeout_secs", config.upstream.timeout_secs),
        ("cache.edge_max_age_secs", config.cache.edge_max_age_secs),
        ("cache.browser_max_age_secs", config.cache.browser_max_age_secs),
        ("cache.max_entries", config.cache.max_entries as u64),
        ("cache.sweep_interval_secs", config.cache.sweep_interval_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("limits.max_body_bytes", config.limits.max_body_bytes as u64),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    if config.cors.allow_methods.trim().is_empty() {
        errors.push(ValidationError::EmptyMethods);
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(config.observability.log_format.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
