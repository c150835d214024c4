//! IP block-list handler that rejects requests from configured addresses.
//!
//! Suited to a fixed deny list; it does not age entries out, so it is the
//! wrong tool for crawler-style adaptive blocking.

use std::net::IpAddr;

use async_trait::async_trait;
use axum::http::StatusCode;
use dashmap::DashMap;
use serde::Deserialize;

use crate::error::{ConfigError, HandlerError};
use crate::handler::intercept::StaticResponse;
use crate::handler::{Context, Flow, Handler};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct IpFilterConfig {
    /// Addresses to block outright.
    block: Vec<String>,
    /// Addresses to add to the block list (update payloads).
    add: Vec<String>,
    /// Addresses to remove from the block list (update payloads).
    remove: Vec<String>,
}

/// Interceptor that aborts requests from blocked client addresses.
pub struct IpFilter {
    blocked: DashMap<IpAddr, ()>,
    reject: StaticResponse,
}

impl IpFilter {
    /// Build from configuration data: a `block` list of addresses plus an
    /// optional reject response (`statusCode`/`contentType`/`message`,
    /// default bare 403).
    pub fn from_value(data: &serde_json::Value) -> Result<Self, ConfigError> {
        let mut filter = Self {
            blocked: DashMap::new(),
            reject: StaticResponse::from_value(StatusCode::FORBIDDEN, data)?,
        };
        filter.apply(data)?;
        Ok(filter)
    }

    fn apply(&mut self, data: &serde_json::Value) -> Result<(), ConfigError> {
        if data.is_null() {
            return Ok(());
        }
        let cfg: IpFilterConfig = serde_json::from_value(data.clone())?;
        for addr in &cfg.block {
            self.blocked.insert(parse_addr(addr, "block")?, ());
        }
        for addr in &cfg.add {
            self.blocked.insert(parse_addr(addr, "add")?, ());
        }
        for addr in &cfg.remove {
            self.blocked.remove(&parse_addr(addr, "remove")?);
        }
        Ok(())
    }

    /// Whether an address is currently blocked.
    pub fn is_blocked(&self, addr: IpAddr) -> bool {
        self.blocked.contains_key(&addr)
    }
}

fn parse_addr(addr: &str, field: &'static str) -> Result<IpAddr, ConfigError> {
    addr.parse().map_err(|e| ConfigError::InvalidField {
        field,
        reason: format!("{addr:?}: {e}"),
    })
}

#[async_trait]
impl Handler for IpFilter {
    async fn handle(&self, ctx: &mut Context) -> Result<Flow, HandlerError> {
        let Some(addr) = ctx.client_ip else {
            tracing::debug!("client address unknown, skipping ip filter");
            return Ok(Flow::Continue);
        };
        if self.is_blocked(addr) {
            tracing::debug!(client_ip = %addr, "blocked address");
            self.reject.write(ctx);
            return Ok(Flow::Abort);
        }
        Ok(Flow::Continue)
    }

    fn update(&mut self, data: &serde_json::Value) -> Result<(), ConfigError> {
        self.reject.update(data)?;
        self.apply(data)
    }

    fn name(&self) -> &'static str {
        "ip-filter"
    }
}
