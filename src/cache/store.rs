//! Key-addressed response store.
//!
//! The store honours the freshness the response itself carries: entries live
//! for the `s-maxage` of their `Cache-Control` header (falling back to
//! `max-age`). There is no other expiry API.

use axum::http::header;
use dashmap::DashMap;
use futures_util::future::{self, BoxFuture};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::cache::key::CacheKey;
use crate::http::headers::Headers;
use crate::http::response::ProxyResponse;
use crate::observability::metrics;

/// Reasons a `put` did not store anything.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The response carries no shared-cache lifetime.
    #[error("response has no s-maxage or max-age directive")]
    Uncacheable,

    /// The store is at capacity.
    #[error("cache full ({0} entries)")]
    Full(usize),
}

/// A key-addressed cache of responses.
///
/// `put` and `lookup` are atomic per key; concurrent writes of the same key
/// race harmlessly.
pub trait CacheStore: Send + Sync {
    /// Fresh response stored under `key`, if any.
    fn lookup<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Option<ProxyResponse>>;

    /// Store `response` under `key`.
    fn put(&self, key: CacheKey, response: ProxyResponse) -> BoxFuture<'_, Result<(), StoreError>>;
}

/// Freshness lifetime for the shared cache layer.
///
/// `s-maxage` wins over `max-age`; directives from every `Cache-Control`
/// value are considered. When a directive repeats, the last one counts, so
/// the `s-maxage` appended by the normalizer overrides an upstream one.
pub fn shared_max_age(headers: &Headers) -> Option<Duration> {
    let mut s_maxage = None;
    let mut max_age = None;
    for value in headers.get_all(header::CACHE_CONTROL) {
        for directive in value.split(',') {
            let directive = directive.trim();
            let (name, arg) = match directive.split_once('=') {
                Some((name, arg)) => (name.trim(), arg.trim().trim_matches('"')),
                None => continue,
            };
            let Ok(secs) = arg.parse::<u64>() else {
                continue;
            };
            if name.eq_ignore_ascii_case("s-maxage") {
                s_maxage = Some(Duration::from_secs(secs));
            } else if name.eq_ignore_ascii_case("max-age") {
                max_age = Some(Duration::from_secs(secs));
            }
        }
    }
    s_maxage.or(max_age)
}

struct Entry {
    response: ProxyResponse,
    expires_at: Instant,
}

/// In-process store backed by a concurrent map.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<CacheKey, Entry>>,
    max_entries: usize,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries,
        }
    }

    /// Number of entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every stale entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        metrics::record_cache_size(self.entries.len());
        removed
    }

    fn get(&self, key: &CacheKey) -> Option<ProxyResponse> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.response.clone());
            }
            drop(entry);
            self.entries.remove(key);
        }
        None
    }

    fn insert(&self, key: CacheKey, response: ProxyResponse) -> Result<(), StoreError> {
        let ttl = shared_max_age(&response.headers).ok_or(StoreError::Uncacheable)?;
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            return Err(StoreError::Full(self.max_entries));
        }
        self.entries.insert(
            key,
            Entry {
                response,
                expires_at: Instant::now() + ttl,
            },
        );
        metrics::record_cache_size(self.entries.len());
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    fn lookup<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Option<ProxyResponse>> {
        Box::pin(future::ready(self.get(key)))
    }

    fn put(&self, key: CacheKey, response: ProxyResponse) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(future::ready(self.insert(key, response)))
    }
}
