//! Async client for the model inference backend with retry logic

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::config::InferenceSettings;
use crate::core::errors::{NlpError, Result};

/// HTTP client for a Hugging Face style inference endpoint
///
/// `GET {endpoint}/models/{id}` probes availability, `POST {endpoint}/models/{id}`
/// runs the pipeline on `{"inputs": ..., "parameters": ...}`.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: reqwest::Client,
    settings: Arc<InferenceSettings>,
    semaphore: Arc<Semaphore>,
}

impl InferenceClient {
    /// Create a new inference client
    pub fn new(settings: InferenceSettings) -> Result<Self> {
        if settings.max_concurrent == 0 {
            return Err(NlpError::ConfigError {
                message: "max_concurrent must be greater than 0".to_string(),
            });
        }

        let timeout = Duration::from_millis(settings.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        let semaphore = Arc::new(Semaphore::new(settings.max_concurrent));

        Ok(Self {
            client,
            settings: Arc::new(settings),
            semaphore,
        })
    }

    /// Backend base URL
    pub fn endpoint(&self) -> &str {
        self.settings.endpoint.trim_end_matches('/')
    }

    fn model_url(&self, model_id: &str) -> String {
        format!("{}/models/{}", self.endpoint(), model_id)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.settings.api_token {
            Some(token) => builder.header("Authorization", format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// Check that the backend serves `model_id`
    pub async fn check_model(&self, model_id: &str) -> Result<()> {
        let response = self
            .authorize(self.client.get(self.model_url(model_id)))
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status.is_success() {
            debug!("Model {} is available", model_id);
            return Ok(());
        }

        if status.as_u16() == 404 {
            return Err(NlpError::ModelNotFound {
                model_id: model_id.to_string(),
            });
        }

        let message = response.text().await.unwrap_or_default();
        Err(NlpError::ApiError {
            status: status.as_u16(),
            message,
        })
    }

    /// Run inference, retrying transient failures with exponential backoff
    pub async fn infer(&self, model_id: &str, inputs: &str, parameters: &Value) -> Result<Value> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| NlpError::InternalError(e.to_string()))?;

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                let delay = self.retry_delay(attempt);
                debug!("Retry attempt {} for model {} in {:?}", attempt, model_id, delay);
                sleep(delay).await;
            }

            match self.send_request(model_id, inputs, parameters).await {
                Ok(output) => {
                    if attempt > 0 {
                        info!("Inference on {} succeeded after {} retries", model_id, attempt);
                    }
                    return Ok(output);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    warn!("Inference on {} failed: {}", model_id, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Backoff before retry `attempt` (1-based): doubles from `retry_delay_ms`,
    /// capped at `max_retry_delay_ms`
    fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        let delay = self
            .settings
            .retry_delay_ms
            .saturating_mul(factor)
            .min(self.settings.max_retry_delay_ms);
        Duration::from_millis(delay)
    }

    /// Send a single inference request
    async fn send_request(&self, model_id: &str, inputs: &str, parameters: &Value) -> Result<Value> {
        let mut body = json!({
            "inputs": inputs,
            "options": { "wait_for_model": true }
        });

        if parameters.as_object().map_or(false, |p| !p.is_empty()) {
            body["parameters"] = parameters.clone();
        }

        let response = self
            .authorize(self.client.post(self.model_url(model_id)))
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();

        if status.is_success() {
            let output: Value = response
                .json()
                .await
                .map_err(|e| NlpError::InvalidOutput {
                    message: e.to_string(),
                })?;

            // Some backends report failures in a 200 body
            if let Some(error) = output.get("error").and_then(|e| e.as_str()) {
                return Err(NlpError::ApiError {
                    status: 500,
                    message: error.to_string(),
                });
            }

            return Ok(output);
        }

        let status_code = status.as_u16();
        let error_text = response.text().await.unwrap_or_default();

        if status_code == 404 {
            return Err(NlpError::ModelNotFound {
                model_id: model_id.to_string(),
            });
        }

        Err(NlpError::ApiError {
            status: status_code,
            message: extract_error_message(&error_text),
        })
    }
}

fn map_send_error(e: reqwest::Error) -> NlpError {
    if e.is_timeout() {
        NlpError::TimeoutError
    } else {
        NlpError::NetworkError {
            message: e.to_string(),
        }
    }
}

/// Pull `error` out of a JSON error body, falling back to the raw text
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(|s| s.to_string()))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = InferenceClient::new(InferenceSettings::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_rejects_zero_concurrency() {
        let settings = InferenceSettings {
            max_concurrent: 0,
            ..Default::default()
        };
        assert!(InferenceClient::new(settings).is_err());
    }

    #[test]
    fn test_model_url() {
        let settings = InferenceSettings {
            endpoint: "http://localhost:9000/".to_string(),
            ..Default::default()
        };
        let client = InferenceClient::new(settings).unwrap();
        assert_eq!(
            client.model_url("dslim/bert-base-NER"),
            "http://localhost:9000/models/dslim/bert-base-NER"
        );
    }

    #[test]
    fn test_retry_delay_doubles_up_to_cap() {
        let client = InferenceClient::new(InferenceSettings::default()).unwrap();

        assert_eq!(client.retry_delay(1), Duration::from_millis(500));
        assert_eq!(client.retry_delay(2), Duration::from_millis(1000));
        assert_eq!(client.retry_delay(5), Duration::from_millis(8000));
        assert_eq!(client.retry_delay(6), Duration::from_millis(10_000));
        assert_eq!(client.retry_delay(20), Duration::from_millis(10_000));
        // Large exponents saturate instead of overflowing
        assert_eq!(client.retry_delay(64), Duration::from_millis(10_000));
        assert_eq!(client.retry_delay(u32::MAX), Duration::from_millis(10_000));
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"error": "Model is currently loading"}"#),
            "Model is currently loading"
        );
        assert_eq!(extract_error_message("Bad Gateway"), "Bad Gateway");
    }
}
