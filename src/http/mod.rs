//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → server.rs dispatch (context acquired from the pool)
//!     → interceptor chain → route lookup → forward | not-found chain
//!     → response taken from the context, context released
//! ```

pub mod server;

pub use server::{Gateway, GatewayState};
