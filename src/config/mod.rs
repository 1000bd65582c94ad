//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! filter document (JSON)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → FilterDocument (validated, immutable)
//!     → routing::RoutingTable::build
//!
//! On reload (file change or SIGHUP):
//!     watcher.rs detects change
//!     → loader.rs loads new document
//!     → validation.rs validates
//!     → new RoutingTable swapped in atomically
//! ```
//!
//! # Design Decisions
//! - The document is immutable once loaded; changes require full reload
//! - Missing arrays default to empty so a minimal document is `{}`
//! - Validation separates syntactic (serde) from semantic checks
//! - Process settings (listen address, timeouts) come from the CLI, not the document

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_document, parse_document, ConfigError};
pub use schema::{DestinationConfig, FilterConfig, FilterDocument, GatewayConfig, LogFormat};
