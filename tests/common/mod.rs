//! Shared fixtures: an in-process pipeline backend and request helpers

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use nlp_analysis_api::core::errors::{NlpError, Result};
use nlp_analysis_api::core::pipeline::BoxFuture;
use nlp_analysis_api::{build_app, AppState, Pipeline, PipelineLoader, PipelineSpec, ServiceConfig, Task};

/// Deterministic stand-in for a pretrained model
pub struct FakePipeline {
    spec: PipelineSpec,
}

impl Pipeline for FakePipeline {
    fn model_id(&self) -> &str {
        &self.spec.model_id
    }

    fn task(&self) -> Task {
        self.spec.task
    }

    fn predict<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            if text.contains("explode") {
                return Err(NlpError::ApiError {
                    status: 500,
                    message: "CUDA out of memory".to_string(),
                });
            }

            let output = match self.spec.task {
                Task::SentimentAnalysis => {
                    let (neg, neu, pos) = if text.contains("love") || text.contains("Great") {
                        (0.0041, 0.0083, 0.98765)
                    } else if text.contains("hate") || text.contains("terrible") {
                        (0.9312, 0.0501, 0.0187)
                    } else {
                        (0.1, 0.8, 0.1)
                    };
                    json!([[
                        { "label": "negative", "score": neg },
                        { "label": "neutral", "score": neu },
                        { "label": "positive", "score": pos }
                    ]])
                }
                Task::TokenClassification => {
                    let mut entities = Vec::new();
                    if let Some(start) = text.find("Apple Inc.") {
                        entities.push(json!({
                            "entity_group": "ORG", "word": "Apple Inc.", "score": 0.99871,
                            "start": start, "end": start + 10
                        }));
                    }
                    if let Some(start) = text.find("Cupertino") {
                        entities.push(json!({
                            "entity_group": "LOC", "word": "Cupertino", "score": 0.99612,
                            "start": start, "end": start + 9
                        }));
                    }
                    Value::Array(entities)
                }
                Task::Translation => json!([{
                    "translation_text": format!("[{}] {}", self.spec.model_id, text)
                }]),
                Task::Text2TextGeneration => json!([
                    { "generated_text": format!("Rephrased: {}", text) },
                    { "generated_text": "second candidate" },
                    { "generated_text": "third candidate" }
                ]),
                Task::Summarization => json!([{ "summary_text": "A short summary." }]),
            };
            Ok(output)
        })
    }
}

/// Loader that refuses listed model ids and any translation into `xx`
#[derive(Default)]
pub struct FakeLoader {
    pub unavailable: Vec<String>,
}

impl FakeLoader {
    pub fn without(models: &[&str]) -> Self {
        Self {
            unavailable: models.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl PipelineLoader for FakeLoader {
    fn load<'a>(&'a self, spec: &'a PipelineSpec) -> BoxFuture<'a, Result<Arc<dyn Pipeline>>> {
        Box::pin(async move {
            if self.unavailable.contains(&spec.model_id) || spec.model_id.ends_with("-xx") {
                return Err(NlpError::ModelNotFound {
                    model_id: spec.model_id.clone(),
                });
            }
            let pipeline: Arc<dyn Pipeline> = Arc::new(FakePipeline { spec: spec.clone() });
            Ok(pipeline)
        })
    }
}

/// Router and state for `config`, with eager models loaded best effort
pub async fn app_with(config: ServiceConfig, loader: FakeLoader) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(&config, Arc::new(loader)).unwrap());
    state.registry.load_all(false).await.unwrap();
    (build_app(state.clone(), &config.server), state)
}

pub async fn app() -> Router {
    app_with(ServiceConfig::default(), FakeLoader::default()).await.0
}

pub fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

/// Send a request and decode the JSON body (`Null` when empty)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value, HeaderMap) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body, headers)
}
