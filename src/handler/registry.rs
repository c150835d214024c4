//! Handler factory registry.
//!
//! # Responsibilities
//! - Map registration names to handler factories
//! - Build single handlers and whole chains from opaque config data
//!
//! # Design Decisions
//! - The registry is an explicit value injected into the gateway at
//!   construction; nothing here is process-global
//! - An empty or unregistered name builds the default forwarder from the
//!   data; such configuration is read as "this is a forward target"

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::config::HandlerEntry;
use crate::error::ConfigError;
use crate::handler::{
    Forwarder, Handler, HandlerChain, IpFilter, NoopInterceptor, StaticResponse, TokenAuth,
};

/// A function that builds a handler from its configuration data.
pub type Factory =
    Box<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Handler>, ConfigError> + Send + Sync>;

/// Name-keyed handler factories.
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl Registry {
    /// An empty registry. Unknown names still fall back to the forwarder.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding every built-in handler.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("forward", |data| {
            Ok(Arc::new(Forwarder::from_value(data)?) as Arc<dyn Handler>)
        });
        registry.register("noop", |_| Ok(Arc::new(NoopInterceptor) as Arc<dyn Handler>));
        registry.register("static-response", |data| {
            Ok(Arc::new(StaticResponse::from_value(StatusCode::NOT_FOUND, data)?) as Arc<dyn Handler>)
        });
        registry.register("ip-filter", |data| {
            Ok(Arc::new(IpFilter::from_value(data)?) as Arc<dyn Handler>)
        });
        registry.register("token-auth", |data| {
            Ok(Arc::new(TokenAuth::from_value(data)?) as Arc<dyn Handler>)
        });
        registry
    }

    /// Insert or overwrite the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn Handler>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Build the handler registered under `name` from `data`. An empty or
    /// unknown name builds the default forwarder. Errors name the factory
    /// that failed and wrap its underlying error.
    pub fn build(
        &self,
        name: &str,
        data: &serde_json::Value,
    ) -> Result<Arc<dyn Handler>, ConfigError> {
        match self.factories.get(name) {
            Some(factory) => factory(data).map_err(|e| e.in_handler(name)),
            None => Forwarder::from_value(data)
                .map(|forwarder| Arc::new(forwarder) as Arc<dyn Handler>)
                .map_err(|e| e.in_handler("forward")),
        }
    }

    /// Build an ordered chain from configuration entries.
    pub fn build_chain(&self, entries: &[HandlerEntry]) -> Result<HandlerChain, ConfigError> {
        let mut handlers = Vec::with_capacity(entries.len());
        for entry in entries {
            handlers.push(self.build(entry.name(), &entry.data())?);
        }
        Ok(HandlerChain::new(handlers))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
