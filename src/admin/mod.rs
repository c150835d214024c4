//! Management surface: a second listener for runtime pipeline changes.
//!
//! Exposes authenticated PUT endpoints that replace the interceptor chain,
//! the not-found chain, or one route's forward chain, and rotate the access
//! token. Every replace validates the supplied configuration by building
//! the whole chain first; on failure the published chain is untouched and
//! the error is returned to the caller. Authentication lives here, not in
//! the dispatch core.

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{middleware, routing::put, Router};
use tokio::net::TcpListener;

use crate::config::AdminConfig;
use crate::error::ServeError;
use crate::http::GatewayState;
use crate::net::tls::load_tls_config;

use self::auth::require_token;
use self::handlers::*;

/// State shared by the management endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub gateway: Arc<GatewayState>,
    /// The access token currently authorizing management calls.
    pub token: Arc<ArcSwap<String>>,
}

impl AdminState {
    pub fn new(gateway: Arc<GatewayState>, token: impl Into<String>) -> Self {
        Self {
            gateway,
            token: Arc::new(ArcSwap::from_pointee(token.into())),
        }
    }
}

/// Build the management router.
pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/interceptors", put(replace_interceptors))
        .route("/admin/not-found", put(replace_not_found))
        .route("/admin/routes/{*route}", put(replace_route))
        .route("/admin/token", put(rotate_token))
        .layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

/// Bind and serve the management listener.
pub async fn serve(state: AdminState, config: AdminConfig) -> Result<(), ServeError> {
    let app = admin_router(state);
    match config.tls {
        Some(tls) => {
            let addr: SocketAddr =
                config
                    .listen
                    .parse()
                    .map_err(|e: std::net::AddrParseError| ServeError::Addr {
                        addr: config.listen.clone(),
                        reason: e.to_string(),
                    })?;
            let rustls = load_tls_config(tls.cert_file.as_ref(), tls.key_file.as_ref()).await?;
            tracing::info!(address = %addr, "management listener up (tls)");
            axum_server::bind_rustls(addr, rustls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listen).await?;
            tracing::info!(address = %listener.local_addr()?, "management listener up");
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}
