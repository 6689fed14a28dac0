//! Mapping of service errors onto HTTP responses

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::core::errors::NlpError;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

/// HTTP-facing error
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            retry_after: None,
        }
    }

    /// Error raised while performing `operation` ("Analysis", "NER", ...)
    pub fn operation(operation: &str, err: NlpError) -> Self {
        match err {
            NlpError::ValidationError { .. } | NlpError::RateLimitError { .. } => Self::from(err),
            NlpError::TranslationUnavailable { .. } => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            NlpError::ModelNotLoaded { .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("{} failed: {}", operation, err),
            ),
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{} failed: {}", operation, err),
            ),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<NlpError> for ApiError {
    fn from(err: NlpError) -> Self {
        match err {
            NlpError::ValidationError { message } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
            }
            NlpError::RateLimitError { limit, retry_after } => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                detail: limit,
                retry_after: Some(retry_after),
            },
            NlpError::TranslationUnavailable { .. } => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            NlpError::ModelNotLoaded { .. } => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status == StatusCode::TOO_MANY_REQUESTS {
            let body = json!({
                "error": "Rate limit exceeded",
                "message": "Too many requests. Please try again later.",
                "detail": self.detail,
            });
            let mut response = (self.status, Json(body)).into_response();
            if let Some(secs) = self.retry_after {
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
            }
            return response;
        }

        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (NlpError::validation("text: bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (
                NlpError::TranslationUnavailable { message: "x".into() },
                StatusCode::BAD_REQUEST,
            ),
            (
                NlpError::ModelNotLoaded { task: "ner".into(), reason: "down".into() },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (NlpError::TimeoutError, StatusCode::INTERNAL_SERVER_ERROR),
            (
                NlpError::RateLimitError { limit: "1 per 1 minute".into(), retry_after: 5 },
                StatusCode::TOO_MANY_REQUESTS,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::operation("NER", err).status(), status);
        }
    }

    #[test]
    fn test_operation_prefix() {
        let err = ApiError::operation(
            "Summarization",
            NlpError::InvalidOutput { message: "output has no 'summary_text'".into() },
        );
        assert_eq!(
            err.detail(),
            "Summarization failed: Invalid pipeline output: output has no 'summary_text'"
        );
    }

    #[test]
    fn test_rate_limit_response_headers() {
        let response = ApiError::from(NlpError::RateLimitError {
            limit: "20 per 1 minute".into(),
            retry_after: 42,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
