//! Handler pipeline: the polymorphic unit of request processing.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → interceptor chain (every request)
//!     → route table lookup
//!         hit  → forward chain for that route
//!         miss → not-found chain
//!     → response taken from the context
//!
//! Chain construction (startup or admin replace):
//!     [{name, data}, ...]
//!     → registry.rs (factory per name)
//!     → HandlerChain (immutable once published)
//! ```
//!
//! # Design Decisions
//! - Chains are never mutated in place; replacement publishes a new chain
//!   and releases the displaced one
//! - A handler that aborts must already have written a response; a handler
//!   that fails is reported as an error so the engine can substitute a
//!   fallback response instead of leaving the client hanging

pub mod context;
pub mod forward;
pub mod intercept;
pub mod ip_filter;
pub mod registry;
pub mod token_auth;

pub use context::{Context, ContextPool};
pub use forward::Forwarder;
pub use intercept::{NoopInterceptor, StaticResponse};
pub use ip_filter::IpFilter;
pub use registry::Registry;
pub use token_auth::TokenAuth;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ConfigError, HandlerError};

/// Outcome of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to the next handler in the chain.
    Continue,
    /// End the chain now. The handler has already produced a response.
    Abort,
}

/// A unit of request-processing logic.
///
/// Handlers run strictly sequentially within a chain, in registration
/// order, and never concurrently for the same request.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Process one request. `Err` means the handler could not finish its
    /// job; the engine logs it and guarantees the client still receives a
    /// response.
    async fn handle(&self, ctx: &mut Context) -> Result<Flow, HandlerError>;

    /// Apply configuration data. Only called before the handler is
    /// published into a chain; published handlers are never mutated.
    fn update(&mut self, data: &serde_json::Value) -> Result<(), ConfigError> {
        let _ = data;
        Ok(())
    }

    /// Release backing resources (connections, caches). Called by whoever
    /// displaces the chain holding this handler. Must be idempotent:
    /// an in-flight request may still hold the chain when this runs.
    fn release(&self) {}

    /// Registration name, for logs.
    fn name(&self) -> &'static str;
}

/// An ordered sequence of handlers, immutable once published.
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self { handlers }
    }

    /// Chain holding a single handler.
    pub fn single(handler: Arc<dyn Handler>) -> Self {
        Self {
            handlers: vec![handler],
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the chain until exhaustion or the first abort.
    pub async fn run(&self, ctx: &mut Context) -> Result<Flow, HandlerError> {
        for handler in &self.handlers {
            match handler.handle(ctx).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Abort) => {
                    tracing::debug!(handler = handler.name(), "chain aborted");
                    return Ok(Flow::Abort);
                }
                Err(e) => {
                    tracing::error!(handler = handler.name(), error = %e, "handler failed");
                    return Err(e);
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Release every handler in the chain.
    pub fn release(&self) {
        for handler in &self.handlers {
            handler.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Recorder {
        hits: Arc<AtomicUsize>,
        outcome: Result<Flow, ()>,
    }

    #[async_trait]
    impl Handler for Recorder {
        async fn handle(&self, ctx: &mut Context) -> Result<Flow, HandlerError> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Ok(flow) => {
                    if flow == Flow::Abort {
                        ctx.respond(
                            StatusCode::IM_A_TEAPOT,
                            axum::http::HeaderValue::from_static("text/plain"),
                            "stopped",
                        );
                    }
                    Ok(flow)
                }
                Err(()) => Err(HandlerError::Internal("boom".into())),
            }
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn recorder(hits: &Arc<AtomicUsize>, outcome: Result<Flow, ()>) -> Arc<dyn Handler> {
        Arc::new(Recorder {
            hits: hits.clone(),
            outcome,
        })
    }

    #[tokio::test]
    async fn test_chain_runs_in_order_to_exhaustion() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = HandlerChain::new(vec![
            recorder(&hits, Ok(Flow::Continue)),
            recorder(&hits, Ok(Flow::Continue)),
            recorder(&hits, Ok(Flow::Continue)),
        ]);
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        let flow = chain.run(&mut ctx).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_abort_skips_later_handlers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = HandlerChain::new(vec![
            recorder(&hits, Ok(Flow::Continue)),
            recorder(&hits, Ok(Flow::Abort)),
            recorder(&hits, Ok(Flow::Continue)),
        ]);
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        let flow = chain.run(&mut ctx).await.unwrap();
        assert_eq!(flow, Flow::Abort);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(ctx.response.is_some());
    }

    #[tokio::test]
    async fn test_error_stops_chain() {
        let hits = Arc::new(AtomicUsize::new(0));
        let chain = HandlerChain::new(vec![
            recorder(&hits, Err(())),
            recorder(&hits, Ok(Flow::Continue)),
        ]);
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        assert!(chain.run(&mut ctx).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
