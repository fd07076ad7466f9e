//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Request path:
//!     cache miss → background.rs (detached cache write, not awaited)
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT or trigger → stop accepting → drain background writes
//!     (bounded by timeouts.drain_secs) → exit
//! ```
//!
//! # Design Decisions
//! - Background writes outlive the response that scheduled them, but not the
//!   process: whatever has not finished by the drain deadline is aborted
//! - Lost cache writes are never reported to a caller

pub mod background;
pub mod shutdown;
pub mod signals;

pub use background::BackgroundTasks;
pub use shutdown::Shutdown;
