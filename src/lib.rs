//! NLP Analysis API - pretrained NLP models over HTTP
//!
//! This library provides request validation, per-route rate limiting, model
//! loading policy and response normalization in front of sentiment analysis,
//! NER, translation, paraphrasing and summarization pipelines.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod providers;
pub mod server;
pub mod services;

// Re-export key types for convenience
pub use crate::core::{
    client::InferenceClient,
    config::ServiceConfig,
    errors::NlpError,
    models::{Sentiment, SentimentResponse, TextInput, TranslationInput},
    pipeline::{Pipeline, PipelineLoader, PipelineSpec, RemoteLoader, Task},
};

pub use crate::providers::ModelRegistry;
pub use crate::server::api::{build_app, run_server, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
