//! Concurrent route table keyed by the top-level path segment.

use std::sync::Arc;

use dashmap::DashMap;

use crate::handler::HandlerChain;

/// Normalize a path to its route key: the longest prefix up to, but not
/// including, the second `/`. A root request keys as `/`.
///
/// `route_key("/a/b")` is `/a`; `route_key("/a")` is also `/a`.
pub fn route_key(path: &str) -> &str {
    if path.is_empty() {
        return "/";
    }
    match path[1..].find('/') {
        Some(i) => &path[..i + 1],
        None => path,
    }
}

/// Map from route key to the published handler chain for that route.
///
/// Reads are lock-free with respect to writers. A store atomically
/// publishes the new chain and releases the one it displaced; in-flight
/// requests that already captured the old chain run to completion
/// against it.
pub struct RouteTable {
    routes: DashMap<String, Arc<HandlerChain>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
        }
    }

    /// Return the chain published for the path's route key, if any.
    pub fn lookup(&self, path: &str) -> Option<Arc<HandlerChain>> {
        self.routes
            .get(route_key(path))
            .map(|entry| entry.value().clone())
    }

    /// Publish `chain` as the association for `route`, releasing any chain
    /// it displaces. The route is normalized to its key first.
    pub fn store(&self, route: &str, chain: Arc<HandlerChain>) {
        let normalized = if route.starts_with('/') {
            route.to_string()
        } else {
            format!("/{route}")
        };
        let key = route_key(&normalized).to_string();
        tracing::info!(route = %key, handlers = chain.len(), "route published");
        if let Some(displaced) = self.routes.insert(key, chain) {
            displaced.release();
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}
