//! Centralized error types for the gateway.

use thiserror::Error;

/// Configuration-time failures: bad listener parameters, malformed handler
/// data, a factory that refused its payload.
///
/// These are always surfaced synchronously to whoever requested the change.
/// When a runtime chain replacement fails, the previously published chain
/// stays in effect.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading a local configuration file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Fetching a configuration URL failed.
    #[error("fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The payload was not valid JSON for the expected shape.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required field is absent.
    #[error("{0:?} must be defined")]
    MissingField(&'static str),

    /// A field is present but unusable.
    #[error("{field:?} {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// A handler factory rejected its configuration data.
    #[error("handler {name:?}: {source}")]
    Handler {
        name: String,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    /// Wrap an error with the name of the factory it came from.
    pub fn in_handler(self, name: impl Into<String>) -> Self {
        ConfigError::Handler {
            name: name.into(),
            source: Box::new(self),
        }
    }
}

/// Request-time handler failures.
///
/// These never escape the dispatch loop: the engine logs them and, when the
/// failing chain produced no response, substitutes a bare 502. A non-2xx
/// status from an upstream is not an error; it is a valid proxied status.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Transport failure talking to an upstream service.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// Anything else a handler could not recover from.
    #[error("{0}")]
    Internal(String),
}

/// Failures binding or serving a listener. Fatal at startup.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("invalid listen address {addr:?}: {reason}")]
    Addr { addr: String, reason: String },

    /// TLS material could not be loaded. `file` names which input failed:
    /// the certificate, the private key, or the assembled pem material.
    #[error("tls {file} {path:?}: {source}")]
    Tls {
        file: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
