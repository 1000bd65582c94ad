//! API filter gateway library.
//!
//! Intercepts inbound requests, runs them through the external pre-filters
//! configured for their path template, and forwards the (possibly rewritten)
//! request to the template's destination.

pub mod config;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::{FilterDocument, GatewayConfig};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use routing::RoutingTable;
