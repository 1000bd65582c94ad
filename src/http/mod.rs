//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, routing table handle)
//!     → request.rs (request ID)
//!     → handler.rs (match template, decode body, run filter chain)
//!     → forward.rs (rewrite URI, strip hop-by-hop headers, stream to destination)
//!     → response.rs (ProxyError on any failure)
//!     → Send to client
//! ```

pub mod forward;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::ProxyError;
pub use server::{AppState, GatewayServer};
