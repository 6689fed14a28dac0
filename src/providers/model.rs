//! Provider for the eagerly loaded, single-model tasks

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::core::errors::{NlpError, Result};
use crate::core::pipeline::{Pipeline, PipelineLoader, PipelineSpec, Task};

/// A pipeline together with the moment it became usable
#[derive(Clone)]
pub struct LoadedPipeline {
    pub pipeline: Arc<dyn Pipeline>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedPipeline {
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            pipeline,
            loaded_at: Utc::now(),
        }
    }
}

/// Load state of one provider, as reported by `/models`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProviderStatus {
    pub name: String,
    pub task: String,
    /// Model the provider is configured with
    pub model: String,
    /// Model actually serving requests, differs from `model` after a fallback
    pub active_model: Option<String>,
    pub loaded: bool,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Wraps one pretrained pipeline for a task, with an optional fallback model
pub struct ModelProvider {
    name: &'static str,
    primary: PipelineSpec,
    fallback: Option<PipelineSpec>,
    loader: Arc<dyn PipelineLoader>,
    loaded: RwLock<Option<LoadedPipeline>>,
    load_lock: Mutex<()>,
}

impl ModelProvider {
    /// Create an unloaded provider
    pub fn new(name: &'static str, primary: PipelineSpec, loader: Arc<dyn PipelineLoader>) -> Self {
        Self {
            name,
            primary,
            fallback: None,
            loader,
            loaded: RwLock::new(None),
            load_lock: Mutex::new(()),
        }
    }

    /// Model to load when the primary one fails
    pub fn with_fallback(mut self, model_id: impl Into<String>) -> Self {
        self.fallback = Some(PipelineSpec::new(self.primary.task, model_id));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn task(&self) -> Task {
        self.primary.task
    }

    /// Load the model unless it is already loaded
    pub async fn load(&self) -> Result<()> {
        self.ensure_loaded().await.map(|_| ())
    }

    async fn ensure_loaded(&self) -> Result<Arc<dyn Pipeline>> {
        if let Some(loaded) = self.loaded.read().await.as_ref() {
            return Ok(loaded.pipeline.clone());
        }

        // Serialize loads so concurrent first requests share one
        let _guard = self.load_lock.lock().await;
        if let Some(loaded) = self.loaded.read().await.as_ref() {
            return Ok(loaded.pipeline.clone());
        }

        info!("Loading {} model: {}", self.name, self.primary.model_id);
        let pipeline = match self.loader.load(&self.primary).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                error!("Error loading {} model {}: {}", self.name, self.primary.model_id, e);
                match &self.fallback {
                    Some(fallback) => {
                        warn!("Falling back to {} model {}", self.name, fallback.model_id);
                        self.loader.load(fallback).await?
                    }
                    None => return Err(e),
                }
            }
        };

        info!("{} model {} loaded successfully", self.name, pipeline.model_id());
        *self.loaded.write().await = Some(LoadedPipeline::new(pipeline.clone()));
        Ok(pipeline)
    }

    /// Run the model, loading it on demand if startup loading did not succeed
    pub async fn predict(&self, text: &str) -> Result<Value> {
        let pipeline = self
            .ensure_loaded()
            .await
            .map_err(|e| NlpError::ModelNotLoaded {
                task: self.name.to_string(),
                reason: e.to_string(),
            })?;

        pipeline.predict(text).await
    }

    pub async fn is_loaded(&self) -> bool {
        self.loaded.read().await.is_some()
    }

    /// Model currently serving requests
    pub async fn active_model(&self) -> Option<String> {
        self.loaded
            .read()
            .await
            .as_ref()
            .map(|l| l.pipeline.model_id().to_string())
    }

    pub async fn status(&self) -> ProviderStatus {
        let loaded = self.loaded.read().await;
        ProviderStatus {
            name: self.name.to_string(),
            task: self.primary.task.to_string(),
            model: self.primary.model_id.clone(),
            active_model: loaded.as_ref().map(|l| l.pipeline.model_id().to_string()),
            loaded: loaded.is_some(),
            loaded_at: loaded.as_ref().map(|l| l.loaded_at),
        }
    }
}
