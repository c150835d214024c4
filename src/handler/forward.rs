//! Default forwarding handler that reverse-proxies to a configured upstream.
//!
//! # Responsibilities
//! - Clone the inbound request into an outbound request for the upstream
//! - Strip the matched route's top-level path segment, keep the query
//! - Filter headers by allow-list (absent means forward everything)
//! - Overlay fixed addition headers on request and response
//! - Stream both bodies without buffering
//!
//! # Design Decisions
//! - An absent/empty `requestHeader` allow-list forwards every inbound
//!   header. That is deliberately permissive and can leak internal headers
//!   toward the upstream; supply an allow-list to tighten it.
//! - Transport failure ends the chain with an error and no written
//!   response; the dispatch engine substitutes a bare 502.
//! - Upstreams are plaintext http. The connector speaks no TLS, so an
//!   `https` `requestUrl` is rejected at construction time rather than
//!   failing on every request.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{header, HeaderName, HeaderValue, Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde::Deserialize;
use url::Url;

use crate::error::{ConfigError, HandlerError};
use crate::handler::{Context, Flow, Handler};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ForwarderConfig {
    /// Upstream base URL, e.g. "http://127.0.0.1:3000". Required.
    request_url: Option<String>,
    /// Outbound call timeout in milliseconds. 0 or absent means no timeout.
    request_timeout: Option<u64>,
    /// Names of inbound headers to forward. Empty means forward all.
    request_header: Vec<String>,
    /// Headers merged into the outbound request, overriding on conflict.
    request_addition_header: HashMap<String, String>,
    /// Headers merged into the proxied response, overriding on conflict.
    response_addition_header: HashMap<String, String>,
}

/// The built-in reverse-proxy terminal handler.
pub struct Forwarder {
    scheme: Scheme,
    authority: Authority,
    timeout: Option<Duration>,
    allow_headers: Vec<HeaderName>,
    request_addition: Vec<(HeaderName, HeaderValue)>,
    response_addition: Vec<(HeaderName, HeaderValue)>,
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    /// Build from opaque configuration data. `requestUrl` is required.
    pub fn from_value(data: &serde_json::Value) -> Result<Self, ConfigError> {
        let cfg: ForwarderConfig = serde_json::from_value(data.clone())?;
        let url = cfg
            .request_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingField("requestUrl"))?;
        let (scheme, authority) = parse_upstream(url)?;

        let mut forwarder = Self {
            scheme,
            authority,
            timeout: None,
            allow_headers: Vec::new(),
            request_addition: Vec::new(),
            response_addition: Vec::new(),
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        };
        forwarder.apply(cfg)?;
        Ok(forwarder)
    }

    fn apply(&mut self, cfg: ForwarderConfig) -> Result<(), ConfigError> {
        if let Some(ms) = cfg.request_timeout {
            self.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if !cfg.request_header.is_empty() {
            self.allow_headers = cfg
                .request_header
                .iter()
                .map(|name| {
                    HeaderName::try_from(name.as_str()).map_err(|e| ConfigError::InvalidField {
                        field: "requestHeader",
                        reason: format!("{name:?}: {e}"),
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        if !cfg.request_addition_header.is_empty() {
            self.request_addition =
                parse_header_pairs(&cfg.request_addition_header, "requestAdditionHeader")?;
        }
        if !cfg.response_addition_header.is_empty() {
            self.response_addition =
                parse_header_pairs(&cfg.response_addition_header, "responseAdditionHeader")?;
        }
        Ok(())
    }
}

fn parse_upstream(url: &str) -> Result<(Scheme, Authority), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidField {
        field: "requestUrl",
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if parsed.scheme() != "http" {
        return Err(invalid(format!(
            "only http upstreams are supported, got {:?}",
            parsed.scheme()
        )));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| invalid("missing host".to_string()))?;
    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let authority = Authority::try_from(authority.as_str()).map_err(|e| invalid(e.to_string()))?;
    Ok((Scheme::HTTP, authority))
}

fn parse_header_pairs(
    raw: &HashMap<String, String>,
    field: &'static str,
) -> Result<Vec<(HeaderName, HeaderValue)>, ConfigError> {
    let mut pairs = Vec::with_capacity(raw.len());
    for (name, value) in raw {
        let name = HeaderName::try_from(name.as_str()).map_err(|e| ConfigError::InvalidField {
            field,
            reason: format!("{name:?}: {e}"),
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidField {
            field,
            reason: format!("{}: {e}", name.as_str()),
        })?;
        pairs.push((name, value));
    }
    Ok(pairs)
}

#[async_trait]
impl Handler for Forwarder {
    async fn handle(&self, ctx: &mut Context) -> Result<Flow, HandlerError> {
        // Outbound path: inbound path minus the matched route segment. The
        // upstream base URL supplies scheme and authority only.
        let inbound_uri = ctx.request.uri().clone();
        let path = inbound_uri.path();
        let stripped = path.strip_prefix(ctx.route.as_str()).unwrap_or(path);
        let stripped = if stripped.is_empty() { "/" } else { stripped };
        let path_and_query = match inbound_uri.query() {
            Some(query) => format!("{stripped}?{query}"),
            None => stripped.to_string(),
        };
        let uri = Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| HandlerError::Internal(format!("outbound uri: {e}")))?;

        // The inbound body streams through unmodified.
        let body = std::mem::replace(ctx.request.body_mut(), Body::empty());
        let mut outbound = Request::builder()
            .method(ctx.request.method().clone())
            .uri(uri)
            .body(body)
            .map_err(|e| HandlerError::Internal(format!("outbound request: {e}")))?;

        let headers = outbound.headers_mut();
        if self.allow_headers.is_empty() {
            // Host is derived from the upstream authority by the client.
            for (name, value) in ctx.request.headers() {
                if name != header::HOST {
                    headers.append(name.clone(), value.clone());
                }
            }
        } else {
            for name in &self.allow_headers {
                if let Some(value) = ctx.request.headers().get(name) {
                    headers.insert(name.clone(), value.clone());
                }
            }
        }
        for (name, value) in &self.request_addition {
            headers.insert(name.clone(), value.clone());
        }

        let call = self.client.request(outbound);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| HandlerError::Upstream(format!("timed out after {limit:?}")))?,
            None => call.await,
        };
        let response: Response<Incoming> =
            result.map_err(|e| HandlerError::Upstream(e.to_string()))?;

        tracing::debug!(
            upstream = %self.authority,
            status = %response.status(),
            "request forwarded"
        );

        let (mut parts, body) = response.into_parts();
        for (name, value) in &self.response_addition {
            parts.headers.insert(name.clone(), value.clone());
        }
        ctx.response = Some(Response::from_parts(parts, Body::new(body)));
        Ok(Flow::Continue)
    }

    fn update(&mut self, data: &serde_json::Value) -> Result<(), ConfigError> {
        let cfg: ForwarderConfig = serde_json::from_value(data.clone())?;
        if let Some(url) = cfg.request_url.as_deref().filter(|url| !url.is_empty()) {
            let (scheme, authority) = parse_upstream(url)?;
            self.scheme = scheme;
            self.authority = authority;
        }
        self.apply(cfg)
    }

    fn name(&self) -> &'static str {
        "forward"
    }
}
