//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config source (file path or http(s) URL, JSON)
//!     → loader.rs (read/fetch & deserialize)
//!     → GatewayConfig::validate (semantic checks)
//!     → Gateway::new (chains built via the handler registry)
//!
//! After startup, chains change only through the management surface;
//! the configuration document itself is never re-read.
//! ```

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{AdminConfig, GatewayConfig, HandlerEntry, TlsConfig};
