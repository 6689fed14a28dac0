//! Provider for translation pipelines, lazily loaded per language pair

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::core::errors::{NlpError, Result};
use crate::core::pipeline::{Pipeline, PipelineLoader, PipelineSpec, Task};
use crate::providers::model::LoadedPipeline;

/// Caches one translation pipeline per `src-tgt` pair
pub struct TranslationProvider {
    template: String,
    loader: Arc<dyn PipelineLoader>,
    pipelines: RwLock<HashMap<String, LoadedPipeline>>,
    load_lock: Mutex<()>,
}

impl TranslationProvider {
    /// `template` names the model, e.g. `Helsinki-NLP/opus-mt-{src}-{tgt}`
    pub fn new(template: impl Into<String>, loader: Arc<dyn PipelineLoader>) -> Self {
        Self {
            template: template.into(),
            loader,
            pipelines: RwLock::new(HashMap::new()),
            load_lock: Mutex::new(()),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn pair_key(source_lang: &str, target_lang: &str) -> String {
        format!("{}-{}", source_lang, target_lang)
    }

    pub fn model_for(&self, source_lang: &str, target_lang: &str) -> String {
        self.template
            .replace("{src}", source_lang)
            .replace("{tgt}", target_lang)
    }

    /// Get the cached pipeline for a pair, loading it on first use
    pub async fn load(&self, source_lang: &str, target_lang: &str) -> Result<Arc<dyn Pipeline>> {
        let key = Self::pair_key(source_lang, target_lang);

        if let Some(loaded) = self.pipelines.read().await.get(&key) {
            return Ok(loaded.pipeline.clone());
        }

        let _guard = self.load_lock.lock().await;
        if let Some(loaded) = self.pipelines.read().await.get(&key) {
            return Ok(loaded.pipeline.clone());
        }

        let model_id = self.model_for(source_lang, target_lang);
        info!("Loading translation model: {}", model_id);

        let spec = PipelineSpec::new(Task::Translation, model_id.clone());
        let pipeline = self.loader.load(&spec).await.map_err(|e| {
            error!("Error loading translation model {}: {}", model_id, e);
            NlpError::TranslationUnavailable {
                message: e.to_string(),
            }
        })?;

        info!("Translation model {} loaded successfully", model_id);
        self.pipelines
            .write()
            .await
            .insert(key, LoadedPipeline::new(pipeline.clone()));

        Ok(pipeline)
    }

    /// Translate `text` with the pipeline for the pair
    pub async fn predict(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<Value> {
        let pipeline = self.load(source_lang, target_lang).await?;
        pipeline.predict(text).await
    }

    /// Pairs with a loaded pipeline, sorted
    pub async fn loaded_pairs(&self) -> Vec<String> {
        let mut pairs: Vec<String> = self.pipelines.read().await.keys().cloned().collect();
        pairs.sort();
        pairs
    }
}
