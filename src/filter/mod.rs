//! Pre-filter subsystem.
//!
//! # Data Flow
//! ```text
//! (template, method, headers, body)
//!     → chain.rs (look up ordered filters, thread snapshot through them)
//!         → invoker.rs (POST snapshot as JSON, read verdict)
//!         → data.rs (FilterData wire shape, merge rules)
//!     → Ok(FilterPassed { headers, body, destination })
//!     → Err(ProxyError) on first rejection or transport fault
//! ```
//!
//! # Design Decisions
//! - Filters run strictly in sequence; each sees the previous one's output
//! - First failure short-circuits; partial progress is discarded
//! - Empty headers/body on an accepting reply mean "unchanged"
//! - The HTTP status of the reply, not a body field, decides accept/reject

pub mod chain;
pub mod data;
pub mod invoker;

pub use chain::{FilterChain, FilterPassed};
pub use data::{FilterData, FilterReply, HeaderValues};
pub use invoker::{FilterError, HttpFilterInvoker, InvokeFilter};
