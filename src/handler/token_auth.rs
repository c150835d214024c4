//! Token authentication handler.
//!
//! Checks a cookie first, then the `Authorization: Bearer` header, against
//! a set of known tokens. Requests presenting no known token are rejected
//! with a configurable response (default bare 401).

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use dashmap::DashMap;
use serde::Deserialize;

use crate::error::{ConfigError, HandlerError};
use crate::handler::intercept::StaticResponse;
use crate::handler::{Context, Flow, Handler};

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TokenAuthConfig {
    /// Tokens accepted as valid.
    tokens: Vec<String>,
    /// Tokens to add to the set (update payloads).
    add: Vec<String>,
    /// Tokens to revoke (update payloads).
    remove: Vec<String>,
    /// Cookie checked before the Authorization header. Default "token".
    cookie_name: Option<String>,
}

/// Interceptor that gates a chain behind a shared token set.
pub struct TokenAuth {
    tokens: DashMap<String, ()>,
    cookie_name: String,
    reject: StaticResponse,
}

impl TokenAuth {
    pub fn from_value(data: &serde_json::Value) -> Result<Self, ConfigError> {
        let mut auth = Self {
            tokens: DashMap::new(),
            cookie_name: "token".to_string(),
            reject: StaticResponse::from_value(StatusCode::UNAUTHORIZED, data)?,
        };
        auth.apply(data)?;
        Ok(auth)
    }

    fn apply(&mut self, data: &serde_json::Value) -> Result<(), ConfigError> {
        if data.is_null() {
            return Ok(());
        }
        let cfg: TokenAuthConfig = serde_json::from_value(data.clone())?;
        for token in cfg.tokens {
            self.tokens.insert(token, ());
        }
        for token in cfg.add {
            self.tokens.insert(token, ());
        }
        for token in &cfg.remove {
            self.tokens.remove(token);
        }
        if let Some(name) = cfg.cookie_name {
            if !name.is_empty() {
                self.cookie_name = name;
            }
        }
        Ok(())
    }

    fn cookie_token<'a>(&self, ctx: &'a Context) -> Option<&'a str> {
        for value in ctx.request.headers().get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            for pair in raw.split(';') {
                let pair = pair.trim();
                if let Some((name, token)) = pair.split_once('=') {
                    if name == self.cookie_name {
                        return Some(token);
                    }
                }
            }
        }
        None
    }

    fn bearer_token<'a>(&self, ctx: &'a Context) -> Option<&'a str> {
        ctx.request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
    }
}

#[async_trait]
impl Handler for TokenAuth {
    async fn handle(&self, ctx: &mut Context) -> Result<Flow, HandlerError> {
        if let Some(token) = self.cookie_token(ctx) {
            if self.tokens.contains_key(token) {
                return Ok(Flow::Continue);
            }
        }
        if let Some(token) = self.bearer_token(ctx) {
            if self.tokens.contains_key(token) {
                return Ok(Flow::Continue);
            }
        }
        tracing::debug!("no valid token presented");
        self.reject.write(ctx);
        Ok(Flow::Abort)
    }

    fn update(&mut self, data: &serde_json::Value) -> Result<(), ConfigError> {
        self.reject.update(data)?;
        self.apply(data)
    }

    fn name(&self) -> &'static str {
        "token-auth"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ContextPool;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;

    fn request_with(name: &str, value: &str) -> Request<Body> {
        Request::builder()
            .uri("/svc")
            .header(name, value)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_bearer_token_accepted() {
        let auth = TokenAuth::from_value(&json!({ "tokens": ["s3cret"] })).unwrap();
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        ctx.request = request_with("authorization", "Bearer s3cret");
        assert_eq!(auth.handle(&mut ctx).await.unwrap(), Flow::Continue);
    }

    #[tokio::test]
    async fn test_cookie_token_accepted() {
        let auth = TokenAuth::from_value(&json!({ "tokens": ["s3cret"] })).unwrap();
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        ctx.request = request_with("cookie", "theme=dark; token=s3cret");
        assert_eq!(auth.handle(&mut ctx).await.unwrap(), Flow::Continue);
    }

    #[tokio::test]
    async fn test_unknown_token_rejected_with_configured_status() {
        let auth = TokenAuth::from_value(&json!({
            "tokens": ["s3cret"],
            "statusCode": 403,
            "message": "denied",
        }))
        .unwrap();
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        ctx.request = request_with("authorization", "Bearer wrong");
        assert_eq!(auth.handle(&mut ctx).await.unwrap(), Flow::Abort);
        assert_eq!(ctx.response.unwrap().status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let auth = TokenAuth::from_value(&json!({ "tokens": ["s3cret"] })).unwrap();
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        assert_eq!(auth.handle(&mut ctx).await.unwrap(), Flow::Abort);
        assert_eq!(ctx.response.unwrap().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_revokes_token() {
        let mut auth = TokenAuth::from_value(&json!({ "tokens": ["old"] })).unwrap();
        auth.update(&json!({ "add": ["new"], "remove": ["old"] }))
            .unwrap();

        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        ctx.request = request_with("authorization", "Bearer old");
        assert_eq!(auth.handle(&mut ctx).await.unwrap(), Flow::Abort);

        let mut ctx = pool.acquire();
        ctx.request = request_with("authorization", "Bearer new");
        assert_eq!(auth.handle(&mut ctx).await.unwrap(), Flow::Continue);
    }
}
