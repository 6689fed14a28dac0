//! Optional API key check for the NLP routes

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::warn;

use crate::server::api::AppState;
use crate::server::error::ApiError;

/// Header carrying the client's API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without the configured key; a no-op when no key is configured
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        None => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "API Key missing. Please provide X-API-Key header.",
        )
        .into_response(),
        Some(key) if key != expected => {
            warn!("Rejected request with invalid API key on {}", request.uri().path());
            ApiError::new(StatusCode::FORBIDDEN, "Invalid API Key").into_response()
        }
        Some(_) => next.run(request).await,
    }
}
