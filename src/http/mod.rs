//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch by path and method)
//!     → request.rs (buffer into InboundRequest, request ID)
//!     → proxy::CacheOrchestrator / proxy::CorsPolicy
//!     → response.rs (ProxyResponse → Axum response)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use headers::Headers;
pub use request::{InboundRequest, UuidRequestId, X_REQUEST_ID};
pub use response::ProxyResponse;
pub use server::HttpServer;
