//! CORS proxying pipeline.
//!
//! # Data Flow
//! ```text
//! OPTIONS  → cors.rs (preflight / Allow)
//! GET|POST → orchestrator.rs
//!              → cache key + lookup
//!              → miss: forwarder.rs → normalizer.rs → background store
//!              → cors.rs (decorate)
//! ```

pub mod cors;
pub mod forwarder;
pub mod normalizer;
pub mod orchestrator;

pub use cors::CorsPolicy;
pub use forwarder::{Forwarder, HttpForwarder};
pub use orchestrator::{CacheOrchestrator, OrchestratorParts};
