//! Custom error types for NLP operations

use thiserror::Error;

/// NLP service errors
#[derive(Error, Debug)]
pub enum NlpError {
    /// Request failed validation
    #[error("{message}")]
    ValidationError {
        message: String,
    },

    /// Model backend returned a non-success status
    #[error("Inference API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Model backend does not know the model id
    #[error("Model not found: {model_id}")]
    ModelNotFound {
        model_id: String,
    },

    /// Model could not be loaded and is not usable
    #[error("Model not loaded: {task} ({reason})")]
    ModelNotLoaded {
        task: String,
        reason: String,
    },

    /// No translation pipeline exists for the requested pair
    #[error("Translation model not available: {message}")]
    TranslationUnavailable {
        message: String,
    },

    /// Pipeline output had an unexpected shape
    #[error("Invalid pipeline output: {message}")]
    InvalidOutput {
        message: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {limit}")]
    RateLimitError {
        limit: String,
        retry_after: u64,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl NlpError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        NlpError::ValidationError {
            message: message.into(),
        }
    }

    /// Whether a failed inference call is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            NlpError::NetworkError { .. } | NlpError::TimeoutError => true,
            NlpError::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<anyhow::Error> for NlpError {
    fn from(err: anyhow::Error) -> Self {
        NlpError::InternalError(err.to_string())
    }
}

impl From<config::ConfigError> for NlpError {
    fn from(err: config::ConfigError) -> Self {
        NlpError::ConfigError {
            message: err.to_string(),
        }
    }
}

/// Result type for NLP operations
pub type Result<T> = std::result::Result<T, NlpError>;
