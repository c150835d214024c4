//! Built-in interception handlers: the no-op interceptor and the fixed
//! static responder used as the default not-found handler.

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode};
use serde::Deserialize;

use crate::error::{ConfigError, HandlerError};
use crate::handler::{Context, Flow, Handler};

/// Interceptor that lets every request through. Substituted when a gateway
/// is configured with no interceptor chain.
pub struct NoopInterceptor;

#[async_trait]
impl Handler for NoopInterceptor {
    async fn handle(&self, _ctx: &mut Context) -> Result<Flow, HandlerError> {
        Ok(Flow::Continue)
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StaticResponseConfig {
    status_code: Option<u16>,
    content_type: Option<String>,
    message: Option<String>,
}

/// Responds with a fixed status, content type and body.
///
/// The default not-found chain holds one of these configured as a bare 404.
/// It is also the reject responder embedded in the access-control handlers.
pub struct StaticResponse {
    status: StatusCode,
    content_type: HeaderValue,
    body: String,
}

impl StaticResponse {
    /// A bare 404 with an empty body.
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            content_type: HeaderValue::from_static("text/html; charset=utf-8"),
            body: String::new(),
        }
    }

    /// Build from opaque configuration data. Absent fields keep the
    /// supplied default status and an HTML content type.
    pub fn from_value(default_status: StatusCode, data: &serde_json::Value) -> Result<Self, ConfigError> {
        let mut responder = Self {
            status: default_status,
            content_type: HeaderValue::from_static("text/html; charset=utf-8"),
            body: String::new(),
        };
        responder.apply(data)?;
        Ok(responder)
    }

    fn apply(&mut self, data: &serde_json::Value) -> Result<(), ConfigError> {
        if data.is_null() {
            return Ok(());
        }
        let cfg: StaticResponseConfig = serde_json::from_value(data.clone())?;
        if let Some(code) = cfg.status_code {
            self.status = StatusCode::from_u16(code).map_err(|e| ConfigError::InvalidField {
                field: "statusCode",
                reason: e.to_string(),
            })?;
        }
        if let Some(content_type) = cfg.content_type {
            self.content_type =
                HeaderValue::from_str(&content_type).map_err(|e| ConfigError::InvalidField {
                    field: "contentType",
                    reason: e.to_string(),
                })?;
        }
        if let Some(message) = cfg.message {
            self.body = message;
        }
        Ok(())
    }

    /// Write the configured response into the context.
    pub fn write(&self, ctx: &mut Context) {
        ctx.respond(self.status, self.content_type.clone(), self.body.clone());
    }
}

#[async_trait]
impl Handler for StaticResponse {
    async fn handle(&self, ctx: &mut Context) -> Result<Flow, HandlerError> {
        self.write(ctx);
        Ok(Flow::Continue)
    }

    fn update(&mut self, data: &serde_json::Value) -> Result<(), ConfigError> {
        self.apply(data)
    }

    fn name(&self) -> &'static str {
        "static-response"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ContextPool;
    use axum::http::header;
    use serde_json::json;

    #[tokio::test]
    async fn test_default_not_found_is_bare_404() {
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        let handler = StaticResponse::not_found();
        assert_eq!(handler.handle(&mut ctx).await.unwrap(), Flow::Continue);
        let response = ctx.response.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_configured_status_and_body() {
        let data = json!({
            "statusCode": 410,
            "contentType": "application/json",
            "message": r#"{"error":"gone"}"#,
        });
        let handler = StaticResponse::from_value(StatusCode::NOT_FOUND, &data).unwrap();
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        handler.handle(&mut ctx).await.unwrap();
        let response = ctx.response.unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_invalid_status_code_rejected() {
        let data = json!({ "statusCode": 99 });
        assert!(StaticResponse::from_value(StatusCode::NOT_FOUND, &data).is_err());
    }

    #[tokio::test]
    async fn test_noop_continues() {
        let pool = ContextPool::new();
        let mut ctx = pool.acquire();
        assert_eq!(
            NoopInterceptor.handle(&mut ctx).await.unwrap(),
            Flow::Continue
        );
        assert!(ctx.response.is_none());
    }
}
