//! Core service layer: configuration, errors, models and the inference backend

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod rate_limiter;
pub mod validation;
