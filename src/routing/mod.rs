//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (RoutingTable::match_route)
//!     → matcher.rs (evaluate path templates)
//!     → Return: matched template or NoMatch
//!
//! Table Compilation (at startup and on reload):
//!     FilterDocument
//!     → register filters per template (declaration order)
//!     → register destinations per template (last write wins)
//!     → Freeze as immutable RoutingTable
//! ```
//!
//! # Design Decisions
//! - Tables compiled once, immutable at runtime; reload swaps a new table in
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same template
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use matcher::{PathTemplate, TemplateError};
pub use router::{RouteLookup, RoutingTable};
