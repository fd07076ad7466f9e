//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → key.rs (GET: URL, POST: URL with /posts<path><sha256(body)>)
//!     → store.rs (lookup / put, freshness from s-maxage)
//! ```
//!
//! # Design Decisions
//! - Keys are URL-shaped so any URL-indexed store can hold POST results
//! - The store is a trait so the orchestrator can be exercised with fakes

pub mod key;
pub mod store;

pub use key::{derive_key, CacheKey};
pub use store::{CacheStore, MemoryStore, StoreError};
