//! The dispatch engine.
//!
//! # Responsibilities
//! - Own the proxy listener and the live pipeline state
//! - Run the three dispatch phases per request:
//!   intercept → route match → forward | not-found
//! - Guarantee context release on every exit path
//! - Publish chain replacements for the management surface
//!
//! # Design Decisions
//! - Interceptor and not-found slots are `ArcSwap`s, the route table a
//!   concurrent map: readers never block on a replacement, and an
//!   in-flight request keeps the chain it captured
//! - A chain that ends in an error without a written response yields a
//!   bare 502 so the client is never left hanging
//! - No per-request deadline is imposed here; timeouts belong to the
//!   forwarding handler's outbound call

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response, StatusCode},
    routing::any,
    Router,
};
use tokio::net::TcpListener;

use crate::config::{GatewayConfig, HandlerEntry};
use crate::error::{ConfigError, ServeError};
use crate::handler::{
    Context, ContextPool, Flow, HandlerChain, NoopInterceptor, Registry, StaticResponse,
};
use crate::net::tls::load_tls_config;
use crate::routing::{route_key, RouteTable};

/// Live pipeline state shared by the dispatch loop and the management
/// surface.
pub struct GatewayState {
    interceptors: ArcSwap<HandlerChain>,
    not_found: ArcSwap<HandlerChain>,
    routes: RouteTable,
    pool: ContextPool,
    registry: Registry,
}

impl GatewayState {
    /// Run one request through the pipeline. The pooled context is released
    /// on every exit path; a handler panic propagates to the transport's
    /// own recovery instead.
    pub async fn dispatch(&self, request: Request<Body>, client_ip: Option<IpAddr>) -> Response<Body> {
        let mut ctx = self.pool.acquire();
        ctx.request = request;
        ctx.client_ip = client_ip;
        let response = self.run_chains(&mut ctx).await;
        self.pool.release(ctx);
        response
    }

    async fn run_chains(&self, ctx: &mut Context) -> Response<Body> {
        let interceptors = self.interceptors.load_full();
        let mut outcome = interceptors.run(ctx).await;

        if matches!(outcome, Ok(Flow::Continue)) {
            let path = ctx.request.uri().path().to_string();
            ctx.route = route_key(&path).to_string();
            outcome = match self.routes.lookup(&path) {
                Some(chain) => chain.run(ctx).await,
                None => {
                    tracing::debug!(route = %ctx.route, "no route matched");
                    self.not_found.load_full().run(ctx).await
                }
            };
        }

        match ctx.response.take() {
            Some(response) => response,
            None => {
                // Chain error, or a chain that never wrote a response.
                if outcome.is_ok() {
                    tracing::warn!(route = %ctx.route, "chain finished without a response");
                }
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::BAD_GATEWAY;
                response
            }
        }
    }

    /// Replace the global interceptor chain.
    pub fn replace_interceptors(&self, entries: &[HandlerEntry]) -> Result<(), ConfigError> {
        let chain = self.build_replacement(entries)?;
        tracing::info!(handlers = chain.len(), "interceptor chain replaced");
        self.interceptors.swap(Arc::new(chain)).release();
        Ok(())
    }

    /// Replace the not-found chain.
    pub fn replace_not_found(&self, entries: &[HandlerEntry]) -> Result<(), ConfigError> {
        let chain = self.build_replacement(entries)?;
        tracing::info!(handlers = chain.len(), "not-found chain replaced");
        self.not_found.swap(Arc::new(chain)).release();
        Ok(())
    }

    /// Replace (or insert) one route's forward chain.
    pub fn replace_route(&self, route: &str, entries: &[HandlerEntry]) -> Result<(), ConfigError> {
        let chain = self.build_replacement(entries)?;
        self.routes.store(route, Arc::new(chain));
        Ok(())
    }

    // A replacement must yield at least one constructible handler; on any
    // failure the currently published chain stays in effect.
    fn build_replacement(&self, entries: &[HandlerEntry]) -> Result<HandlerChain, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "handlers",
                reason: "must contain at least one handler".to_string(),
            });
        }
        self.registry.build_chain(entries)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// The gateway: configuration plus the live pipeline it serves.
pub struct Gateway {
    state: Arc<GatewayState>,
    config: GatewayConfig,
}

impl Gateway {
    /// Build the pipeline from configuration. Any handler construction
    /// error aborts startup. Empty interceptor/not-found configuration is
    /// substituted with the built-in defaults.
    pub fn new(config: GatewayConfig, registry: Registry) -> Result<Self, ConfigError> {
        let mut interceptors = registry.build_chain(&config.interceptors)?;
        if interceptors.is_empty() {
            interceptors = HandlerChain::single(Arc::new(NoopInterceptor));
        }
        let mut not_found = registry.build_chain(&config.not_found)?;
        if not_found.is_empty() {
            not_found = HandlerChain::single(Arc::new(StaticResponse::not_found()));
        }

        let routes = RouteTable::new();
        for (route, entries) in &config.routes {
            routes.store(route, Arc::new(registry.build_chain(entries)?));
        }

        Ok(Self {
            state: Arc::new(GatewayState {
                interceptors: ArcSwap::from_pointee(interceptors),
                not_found: ArcSwap::from_pointee(not_found),
                routes,
                pool: ContextPool::new(),
                registry,
            }),
            config,
        })
    }

    /// Shared pipeline state, for the management surface.
    pub fn state(&self) -> Arc<GatewayState> {
        self.state.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the catch-all router feeding every request into dispatch.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(handle_request))
            .route("/{*path}", any(handle_request))
            .with_state(self.state.clone())
    }

    /// Serve on an already-bound listener (plaintext). Used by tests and by
    /// `serve` when no TLS material is configured.
    pub async fn run(self, listener: TcpListener) -> Result<(), ServeError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, routes = self.state.routes.len(), "gateway listening");
        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("gateway stopped");
        Ok(())
    }

    /// Bind the configured address and serve, TLS-wrapped when certificate
    /// material is configured.
    pub async fn serve(self) -> Result<(), ServeError> {
        match self.config.tls.clone() {
            Some(tls) => {
                let addr: SocketAddr =
                    self.config.listen.parse().map_err(|e: std::net::AddrParseError| {
                        ServeError::Addr {
                            addr: self.config.listen.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                let rustls = load_tls_config(tls.cert_file.as_ref(), tls.key_file.as_ref()).await?;
                tracing::info!(address = %addr, routes = self.state.routes.len(), "gateway listening (tls)");
                let app = self
                    .router()
                    .into_make_service_with_connect_info::<SocketAddr>();
                axum_server::bind_rustls(addr, rustls).serve(app).await?;
                Ok(())
            }
            None => {
                let listener = TcpListener::bind(&self.config.listen).await?;
                self.run(listener).await
            }
        }
    }
}

async fn handle_request(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    state.dispatch(request, Some(addr.ip())).await
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
