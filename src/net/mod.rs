//! Network helpers.

pub mod tls;
