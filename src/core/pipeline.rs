//! Pipeline abstraction over pretrained models

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

use crate::core::client::InferenceClient;
use crate::core::errors::Result;

/// Boxed future returned by the object-safe pipeline traits
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Kind of pipeline a model is loaded as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    SentimentAnalysis,
    TokenClassification,
    Translation,
    Text2TextGeneration,
    Summarization,
}

impl Task {
    /// Generation/decoding parameters each task is run with
    pub fn default_parameters(self) -> Value {
        match self {
            Task::SentimentAnalysis => json!({ "top_k": null }),
            Task::TokenClassification => json!({ "aggregation_strategy": "simple" }),
            Task::Translation => json!({}),
            Task::Text2TextGeneration => json!({
                "max_length": 60,
                "num_beams": 5,
                "num_return_sequences": 3
            }),
            Task::Summarization => json!({
                "max_length": 150,
                "min_length": 30,
                "do_sample": false
            }),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::SentimentAnalysis => write!(f, "sentiment-analysis"),
            Task::TokenClassification => write!(f, "ner"),
            Task::Translation => write!(f, "translation"),
            Task::Text2TextGeneration => write!(f, "text2text-generation"),
            Task::Summarization => write!(f, "summarization"),
        }
    }
}

/// What to load: a task, a model id and the parameters to run it with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub task: Task,
    pub model_id: String,
    pub parameters: Value,
}

impl PipelineSpec {
    pub fn new(task: Task, model_id: impl Into<String>) -> Self {
        Self {
            task,
            model_id: model_id.into(),
            parameters: task.default_parameters(),
        }
    }
}

/// A loaded model that turns text into task-shaped JSON output
pub trait Pipeline: Send + Sync {
    /// Model this pipeline runs
    fn model_id(&self) -> &str;

    /// Task this pipeline was loaded for
    fn task(&self) -> Task;

    /// Run the model on `text`
    fn predict<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Value>>;
}

/// Creates pipelines from specs
pub trait PipelineLoader: Send + Sync {
    fn load<'a>(&'a self, spec: &'a PipelineSpec) -> BoxFuture<'a, Result<Arc<dyn Pipeline>>>;
}

/// Pipeline served by the remote inference backend
#[derive(Debug, Clone)]
pub struct RemotePipeline {
    client: InferenceClient,
    spec: PipelineSpec,
}

impl Pipeline for RemotePipeline {
    fn model_id(&self) -> &str {
        &self.spec.model_id
    }

    fn task(&self) -> Task {
        self.spec.task
    }

    fn predict<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            self.client
                .infer(&self.spec.model_id, text, &self.spec.parameters)
                .await
        })
    }
}

/// Loads pipelines by probing the inference backend for the model
#[derive(Debug, Clone)]
pub struct RemoteLoader {
    client: InferenceClient,
}

impl RemoteLoader {
    pub fn new(client: InferenceClient) -> Self {
        Self { client }
    }
}

impl PipelineLoader for RemoteLoader {
    fn load<'a>(&'a self, spec: &'a PipelineSpec) -> BoxFuture<'a, Result<Arc<dyn Pipeline>>> {
        Box::pin(async move {
            self.client.check_model(&spec.model_id).await?;
            info!(
                "Pipeline {} ready for model {} at {}",
                spec.task,
                spec.model_id,
                self.client.endpoint()
            );
            let pipeline: Arc<dyn Pipeline> = Arc::new(RemotePipeline {
                client: self.client.clone(),
                spec: spec.clone(),
            });
            Ok(pipeline)
        })
    }
}
