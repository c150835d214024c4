//! Configuration schema definitions.
//!
//! The gateway is configured with a single JSON document. All types derive
//! Serde traits; chain entries stay opaque here and are interpreted by the
//! handler registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    /// Bind address for the proxy listener (e.g. "0.0.0.0:8080").
    pub listen: String,

    /// Optional TLS material for the proxy listener.
    pub tls: Option<TlsConfig>,

    /// Optional management listener.
    pub admin: Option<AdminConfig>,

    /// Handlers run for every request before routing.
    pub interceptors: Vec<HandlerEntry>,

    /// Handlers run when no route matches. Empty means a bare 404 responder is substituted.
    pub not_found: Vec<HandlerEntry>,

    /// Forward chain per route path. Keys are normalized to their top-level
    /// segment when published.
    pub routes: BTreeMap<String, Vec<HandlerEntry>>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            tls: None,
            admin: None,
            interceptors: Vec::new(),
            not_found: Vec::new(),
            routes: BTreeMap::new(),
        }
    }
}

impl GatewayConfig {
    /// Semantic checks beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.is_empty() {
            return Err(ConfigError::MissingField("listen"));
        }
        if let Some(admin) = &self.admin {
            if admin.listen.is_empty() {
                return Err(ConfigError::MissingField("admin.listen"));
            }
            if admin.access_token.is_empty() {
                return Err(ConfigError::MissingField("admin.accessToken"));
            }
        }
        Ok(())
    }
}

/// TLS material for a listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// Path to the certificate file (PEM).
    pub cert_file: String,

    /// Path to the private key file (PEM).
    pub key_file: String,
}

/// Management listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfig {
    /// Bind address for the management listener.
    pub listen: String,

    /// Optional TLS material for the management listener.
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    /// Bearer token authorizing management calls. Rotatable at runtime.
    pub access_token: String,
}

/// One chain entry: either a bare registration name, or an object whose
/// `name` selects the factory and whose remaining keys are its data.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HandlerEntry {
    Name(String),
    Object(serde_json::Map<String, serde_json::Value>),
}

impl HandlerEntry {
    /// The registration name. Empty selects the default forwarder.
    pub fn name(&self) -> &str {
        match self {
            HandlerEntry::Name(name) => name,
            HandlerEntry::Object(map) => map
                .get("name")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(""),
        }
    }

    /// The opaque data passed to the factory.
    pub fn data(&self) -> serde_json::Value {
        match self {
            HandlerEntry::Name(_) => serde_json::Value::Null,
            HandlerEntry::Object(map) => serde_json::Value::Object(map.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_config_parses() {
        let config: GatewayConfig =
            serde_json::from_value(json!({ "listen": ":8080" })).unwrap();
        assert_eq!(config.listen, ":8080");
        assert!(config.interceptors.is_empty());
        assert!(config.routes.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_full_config_parses() {
        let config: GatewayConfig = serde_json::from_value(json!({
            "listen": "0.0.0.0:8080",
            "admin": { "listen": "127.0.0.1:9090", "accessToken": "t0ken" },
            "interceptors": [
                "noop",
                { "name": "ip-filter", "block": ["10.0.0.1"] },
            ],
            "notFound": [ { "name": "static-response", "statusCode": 404 } ],
            "routes": {
                "/service1": [ { "requestUrl": "http://127.0.0.1:3000" } ],
            },
        }))
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.interceptors.len(), 2);
        assert_eq!(config.interceptors[0].name(), "noop");
        assert_eq!(config.interceptors[1].name(), "ip-filter");
        assert_eq!(config.not_found.len(), 1);
        // A route entry with no name selects the forwarder.
        assert_eq!(config.routes["/service1"][0].name(), "");
    }

    #[test]
    fn test_admin_requires_token() {
        let config: GatewayConfig = serde_json::from_value(json!({
            "listen": ":8080",
            "admin": { "listen": ":9090", "accessToken": "" },
        }))
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_entry_data_carries_whole_object() {
        let entry: HandlerEntry =
            serde_json::from_value(json!({ "name": "forward", "requestUrl": "http://x" }))
                .unwrap();
        assert_eq!(entry.name(), "forward");
        assert_eq!(entry.data()["requestUrl"], "http://x");

        let entry: HandlerEntry = serde_json::from_value(json!("noop")).unwrap();
        assert_eq!(entry.name(), "noop");
        assert!(entry.data().is_null());
    }
}
