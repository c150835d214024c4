//! Pluggable HTTP gateway library.
//!
//! Every request passes through three phases: a shared interceptor chain,
//! route dispatch on the first path segment, and a not-found fallback when
//! no route matches. Chains are ordered lists of [`handler::Handler`]s and
//! can be replaced at runtime through the management surface without
//! dropping in-flight requests.

pub mod admin;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use handler::{Context, Flow, Handler, HandlerChain, Registry};
pub use http::{Gateway, GatewayState};
