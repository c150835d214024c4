//! Request handlers for the management endpoints.
//!
//! Every replacement endpoint takes the same payload shape as the matching
//! section of the startup configuration: a JSON array of chain entries. A
//! successful replacement answers 204; a rejected one answers 400 with the
//! error message and leaves the running pipeline unchanged.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::config::HandlerEntry;
use crate::error::ConfigError;

use super::AdminState;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TokenBody {
    pub token: String,
}

fn publish(result: Result<(), ConfigError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "chain replacement rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// PUT /admin/interceptors
pub async fn replace_interceptors(
    State(state): State<AdminState>,
    Json(entries): Json<Vec<HandlerEntry>>,
) -> Response {
    publish(state.gateway.replace_interceptors(&entries))
}

/// PUT /admin/not-found
pub async fn replace_not_found(
    State(state): State<AdminState>,
    Json(entries): Json<Vec<HandlerEntry>>,
) -> Response {
    publish(state.gateway.replace_not_found(&entries))
}

/// PUT /admin/routes/{*route}
///
/// The captured segment arrives without its leading slash; the route table
/// normalizes it back to a top-level key.
pub async fn replace_route(
    State(state): State<AdminState>,
    Path(route): Path<String>,
    Json(entries): Json<Vec<HandlerEntry>>,
) -> Response {
    publish(state.gateway.replace_route(&route, &entries))
}

/// PUT /admin/token
///
/// Swaps the access token; the old token stops working immediately.
pub async fn rotate_token(
    State(state): State<AdminState>,
    Json(body): Json<TokenBody>,
) -> Response {
    if body.token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "\"token\" must be defined".to_string(),
            }),
        )
            .into_response();
    }
    state.token.store(Arc::new(body.token));
    tracing::info!("management token rotated");
    StatusCode::NO_CONTENT.into_response()
}
