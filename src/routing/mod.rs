//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path "/service1/x?q=1"
//!     → route_key → "/service1"
//!     → table.rs (lock-free lookup)
//!     → Some(chain) | None (not-found chain runs)
//! ```
//!
//! # Design Decisions
//! - Only the first path segment participates in matching; deeper segments
//!   are forwarded verbatim to the upstream
//! - Lookups never block on concurrent stores; a store is a single atomic
//!   publish of a whole chain, never a partial mutation

pub mod table;

pub use table::{route_key, RouteTable};
