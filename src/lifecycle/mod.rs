//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse flags → Load document → Build routing table → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Reload the filter document
//! ```
//!
//! # Design Decisions
//! - Fail fast: an unreadable filter document at startup is fatal
//! - A bad document on reload is logged and ignored

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
