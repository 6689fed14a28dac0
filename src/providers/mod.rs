//! Model providers: one pretrained pipeline per task

pub mod model;
pub mod translation;

pub use model::{LoadedPipeline, ModelProvider, ProviderStatus};
pub use translation::TranslationProvider;

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::config::ModelSettings;
use crate::core::errors::{NlpError, Result};
use crate::core::pipeline::{PipelineLoader, PipelineSpec, Task};

/// Outcome of startup model loading
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// All providers the service dispatches to
#[derive(Clone)]
pub struct ModelRegistry {
    pub sentiment: Arc<ModelProvider>,
    pub ner: Arc<ModelProvider>,
    pub paraphrase: Arc<ModelProvider>,
    pub summarization: Arc<ModelProvider>,
    pub translation: Arc<TranslationProvider>,
}

impl ModelRegistry {
    /// Build unloaded providers for the configured models
    pub fn from_settings(settings: &ModelSettings, loader: Arc<dyn PipelineLoader>) -> Self {
        let mut sentiment = ModelProvider::new(
            "sentiment",
            PipelineSpec::new(Task::SentimentAnalysis, settings.sentiment.clone()),
            loader.clone(),
        );
        if let Some(fallback) = &settings.sentiment_fallback {
            sentiment = sentiment.with_fallback(fallback.clone());
        }

        Self {
            sentiment: Arc::new(sentiment),
            ner: Arc::new(ModelProvider::new(
                "ner",
                PipelineSpec::new(Task::TokenClassification, settings.ner.clone()),
                loader.clone(),
            )),
            paraphrase: Arc::new(ModelProvider::new(
                "paraphrase",
                PipelineSpec::new(Task::Text2TextGeneration, settings.paraphrase.clone()),
                loader.clone(),
            )),
            summarization: Arc::new(ModelProvider::new(
                "summarization",
                PipelineSpec::new(Task::Summarization, settings.summarization.clone()),
                loader.clone(),
            )),
            translation: Arc::new(TranslationProvider::new(
                settings.translation_template.clone(),
                loader,
            )),
        }
    }

    /// Providers loaded at startup; translation loads per pair on demand
    pub fn eager(&self) -> [&Arc<ModelProvider>; 4] {
        [&self.sentiment, &self.ner, &self.paraphrase, &self.summarization]
    }

    /// Load every eager provider
    ///
    /// In strict mode the first failure is returned. Otherwise failures are
    /// logged, the provider stays unloaded and retries on its first request.
    pub async fn load_all(&self, strict: bool) -> Result<LoadReport> {
        info!("Loading models...");
        let mut report = LoadReport::default();

        for provider in self.eager() {
            match provider.load().await {
                Ok(()) => report.loaded.push(provider.name().to_string()),
                Err(e) if strict => {
                    error!("Error loading models: {}", e);
                    return Err(NlpError::ModelNotLoaded {
                        task: provider.name().to_string(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!("{} model unavailable, will retry on demand: {}", provider.name(), e);
                    report.failed.push((provider.name().to_string(), e.to_string()));
                }
            }
        }

        if report.is_complete() {
            info!("All models loaded successfully!");
        } else {
            warn!(
                "Loaded {} of {} models",
                report.loaded.len(),
                report.loaded.len() + report.failed.len()
            );
        }

        Ok(report)
    }

    pub async fn statuses(&self) -> Vec<ProviderStatus> {
        let mut statuses = Vec::with_capacity(4);
        for provider in self.eager() {
            statuses.push(provider.status().await);
        }
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{BoxFuture, Pipeline};
    use serde_json::{json, Value};

    struct NullPipeline(PipelineSpec);

    impl Pipeline for NullPipeline {
        fn model_id(&self) -> &str {
            &self.0.model_id
        }

        fn task(&self) -> Task {
            self.0.task
        }

        fn predict<'a>(&'a self, _text: &'a str) -> BoxFuture<'a, Result<Value>> {
            Box::pin(async { Ok(json!([])) })
        }
    }

    /// Fails for NER, succeeds for everything else
    struct NoNerLoader;

    impl PipelineLoader for NoNerLoader {
        fn load<'a>(&'a self, spec: &'a PipelineSpec) -> BoxFuture<'a, Result<Arc<dyn Pipeline>>> {
            Box::pin(async move {
                if spec.task == Task::TokenClassification {
                    return Err(NlpError::ModelNotFound {
                        model_id: spec.model_id.clone(),
                    });
                }
                let pipeline: Arc<dyn Pipeline> = Arc::new(NullPipeline(spec.clone()));
                Ok(pipeline)
            })
        }
    }

    #[tokio::test]
    async fn test_best_effort_loading() {
        let registry = ModelRegistry::from_settings(&ModelSettings::default(), Arc::new(NoNerLoader));

        let report = registry.load_all(false).await.unwrap();
        assert_eq!(report.loaded, vec!["sentiment", "paraphrase", "summarization"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "ner");

        assert!(registry.sentiment.is_loaded().await);
        assert!(!registry.ner.is_loaded().await);
        assert!(registry.translation.loaded_pairs().await.is_empty());
    }

    #[tokio::test]
    async fn test_strict_loading_fails() {
        let registry = ModelRegistry::from_settings(&ModelSettings::default(), Arc::new(NoNerLoader));
        assert!(registry.load_all(true).await.is_err());
    }

    #[tokio::test]
    async fn test_statuses() {
        let registry = ModelRegistry::from_settings(&ModelSettings::default(), Arc::new(NoNerLoader));
        registry.sentiment.load().await.unwrap();

        let statuses = registry.statuses().await;
        assert_eq!(statuses.len(), 4);
        assert_eq!(statuses[0].name, "sentiment");
        assert!(statuses[0].loaded);
        assert_eq!(statuses[1].model, "dslim/bert-base-NER");
        assert!(!statuses[1].loaded);
    }
}
