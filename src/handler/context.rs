//! Per-request context and the pool that recycles it.
//!
//! # Responsibilities
//! - Carry one request's state through a handler chain
//! - Reuse context allocations across requests
//!
//! # Design Decisions
//! - The dispatch engine releases a context exactly once per accepted
//!   request, on every exit path; a handler panic propagates through the
//!   transport's own recovery and the context is simply dropped
//! - `release` fully resets every field before the context goes back to
//!   the pool, so a recycled context never leaks the previous request

use std::any::Any;
use std::net::IpAddr;
use std::sync::Mutex;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, StatusCode};

/// Mutable per-request state threaded through a handler chain.
pub struct Context {
    /// The inbound request. A terminal handler may take the body out of it
    /// to stream it upstream; headers and URI stay readable either way.
    pub request: Request<Body>,
    /// The response under construction. A handler that aborts the chain
    /// must have set this first.
    pub response: Option<Response<Body>>,
    /// The matched route key (the top-level path segment).
    pub route: String,
    /// Address of the connected client, for address-based handlers.
    pub client_ip: Option<IpAddr>,
    /// Opaque slot for passing data between handlers of one chain.
    pub data: Option<Box<dyn Any + Send>>,
}

impl Context {
    fn empty() -> Self {
        Self {
            request: Request::new(Body::empty()),
            response: None,
            route: String::new(),
            client_ip: None,
            data: None,
        }
    }

    /// Set a complete response: status, content type and body.
    pub fn respond(&mut self, status: StatusCode, content_type: HeaderValue, body: impl Into<Body>) {
        let mut response = Response::new(body.into());
        *response.status_mut() = status;
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
        self.response = Some(response);
    }

    fn reset(&mut self) {
        self.request = Request::new(Body::empty());
        self.response = None;
        self.route.clear();
        self.client_ip = None;
        self.data = None;
    }
}

/// Pool of reusable [`Context`] values.
///
/// `acquire` pops a recycled context or allocates a fresh one; `release`
/// resets and returns it. A released context must never be read again.
pub struct ContextPool {
    slots: Mutex<Vec<Context>>,
}

impl ContextPool {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Take a context from the pool, allocating when the pool is empty.
    pub fn acquire(&self) -> Context {
        self.slots
            .lock()
            .ok()
            .and_then(|mut slots| slots.pop())
            .unwrap_or_else(Context::empty)
    }

    /// Reset a context and return it to the pool.
    pub fn release(&self, mut ctx: Context) {
        ctx.reset();
        if let Ok(mut slots) = self.slots.lock() {
            slots.push(ctx);
        }
    }

    /// Number of idle contexts currently pooled.
    pub fn idle(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_allocates_when_empty() {
        let pool = ContextPool::new();
        assert_eq!(pool.idle(), 0);
        let ctx = pool.acquire();
        assert!(ctx.response.is_none());
        assert!(ctx.route.is_empty());
    }

    #[test]
    fn test_release_resets_all_fields() {
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        ctx.request = Request::builder()
            .uri("/svc/a")
            .header("x-a", "1")
            .body(Body::empty())
            .unwrap();
        ctx.route = "/svc".to_string();
        ctx.client_ip = Some("10.0.0.1".parse().unwrap());
        ctx.data = Some(Box::new(42u32));
        ctx.respond(StatusCode::OK, HeaderValue::from_static("text/plain"), "done");

        pool.release(ctx);
        assert_eq!(pool.idle(), 1);

        let ctx = pool.acquire();
        assert_eq!(ctx.request.uri().path(), "/");
        assert!(ctx.request.headers().is_empty());
        assert!(ctx.response.is_none());
        assert!(ctx.route.is_empty());
        assert!(ctx.client_ip.is_none());
        assert!(ctx.data.is_none());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_respond_sets_status_and_content_type() {
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        ctx.respond(
            StatusCode::FORBIDDEN,
            HeaderValue::from_static("application/json"),
            r#"{"error":"blocked"}"#,
        );
        let response = ctx.response.as_ref().unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
