//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::core::rate_limiter::RateLimit;

/// Environment variable prefix for configuration overrides (`NLP_SERVER__PORT=7860`)
pub const ENV_PREFIX: &str = "NLP";

/// Environment variable naming a configuration file
pub const CONFIG_PATH_ENV: &str = "NLP_CONFIG";

/// Largest accepted `inference.max_retries`
pub const MAX_RETRIES: u32 = 10;

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub inference: InferenceSettings,
    pub models: ModelSettings,
    pub limits: LimitSettings,
    pub rate_limits: RateLimitSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Comma separated list of allowed origins, `*` allows any
    pub cors_origins: String,
    /// When set, NLP routes require a matching `X-API-Key` header
    pub api_key: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: "*".to_string(),
            api_key: None,
        }
    }
}

impl ServerSettings {
    /// Allowed origins, or `None` when any origin is accepted
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }
}

/// Model backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Upper bound for a single backoff sleep
    pub max_retry_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co".to_string(),
            api_token: None,
            max_concurrent: 8,
            max_retries: 2,
            retry_delay_ms: 500,
            max_retry_delay_ms: 10_000,
            timeout_ms: 60000,
        }
    }
}

/// Pretrained model selection and loading policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub sentiment: String,
    pub sentiment_fallback: Option<String>,
    pub ner: String,
    pub paraphrase: String,
    pub summarization: String,
    /// Model id template for translation, `{src}` and `{tgt}` are substituted
    pub translation_template: String,
    /// Load the eager models when the server starts
    pub preload: bool,
    /// Abort startup when an eager model fails to load
    pub strict_startup: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            sentiment: "cardiffnlp/twitter-roberta-base-sentiment-latest".to_string(),
            sentiment_fallback: Some(
                "distilbert/distilbert-base-uncased-finetuned-sst-2-english".to_string(),
            ),
            ner: "dslim/bert-base-NER".to_string(),
            paraphrase: "tuner007/pegasus_paraphrase".to_string(),
            summarization: "facebook/bart-large-cnn".to_string(),
            translation_template: "Helsinki-NLP/opus-mt-{src}-{tgt}".to_string(),
            preload: true,
            strict_startup: false,
        }
    }
}

/// Input size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub max_text_chars: usize,
    pub max_translation_chars: usize,
    pub max_batch_items: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_text_chars: 5000,
            max_translation_chars: 3000,
            max_batch_items: 100,
        }
    }
}

/// Per-route request limits, written as `"20/minute"`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub default_limit: String,
    pub analyze: String,
    pub analyze_batch: String,
    pub ner: String,
    pub translate: String,
    pub paraphrase: String,
    pub summarize: String,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_limit: "100/minute".to_string(),
            analyze: "20/minute".to_string(),
            analyze_batch: "10/minute".to_string(),
            ner: "30/minute".to_string(),
            translate: "20/minute".to_string(),
            paraphrase: "10/minute".to_string(),
            summarize: "10/minute".to_string(),
        }
    }
}

impl RateLimitSettings {
    /// Raw limit expression for a route path
    pub fn limit_for(&self, route: &str) -> &str {
        match route {
            "/analyze" => &self.analyze,
            "/analyze-batch" => &self.analyze_batch,
            "/ner" => &self.ner,
            "/translate" => &self.translate,
            "/paraphrase" => &self.paraphrase,
            "/summarize" => &self.summarize,
            _ => &self.default_limit,
        }
    }

    /// Parse every configured limit
    pub fn parsed(&self) -> anyhow::Result<Vec<(&'static str, RateLimit)>> {
        let routes = [
            "/analyze",
            "/analyze-batch",
            "/ner",
            "/translate",
            "/paraphrase",
            "/summarize",
        ];

        let mut limits = Vec::with_capacity(routes.len());
        for route in routes {
            let limit: RateLimit = self.limit_for(route).parse()?;
            limits.push((route, limit));
        }
        Ok(limits)
    }
}

impl ServiceConfig {
    /// Load configuration from defaults, an optional file and `NLP_*` environment variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        match (path, env_path.as_deref()) {
            (Some(path), _) => {
                info!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path));
            }
            (None, Some(env_path)) => {
                info!("Loading configuration from {}", env_path);
                builder = builder.add_source(config::File::with_name(env_path));
            }
            (None, None) => {}
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;

        if config.inference.api_token.is_none() {
            config.inference.api_token = std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    /// Render the effective configuration as YAML, with secrets masked
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        let mut masked = self.clone();
        if masked.server.api_key.is_some() {
            masked.server.api_key = Some("********".to_string());
        }
        if masked.inference.api_token.is_some() {
            masked.inference.api_token = Some("********".to_string());
        }
        Ok(serde_yaml::to_string(&masked)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.inference.endpoint.is_empty() {
            return Err(anyhow::anyhow!("Inference endpoint is required"));
        }

        if !self.inference.endpoint.starts_with("http://")
            && !self.inference.endpoint.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "Inference endpoint must be an http(s) URL: {}",
                self.inference.endpoint
            ));
        }

        if self.inference.max_concurrent == 0 {
            return Err(anyhow::anyhow!("max_concurrent must be greater than 0"));
        }

        if self.inference.max_retries > MAX_RETRIES {
            return Err(anyhow::anyhow!(
                "max_retries must be at most {} (got {})",
                MAX_RETRIES,
                self.inference.max_retries
            ));
        }

        if self.inference.max_retry_delay_ms < self.inference.retry_delay_ms {
            return Err(anyhow::anyhow!(
                "max_retry_delay_ms must not be below retry_delay_ms"
            ));
        }

        if self.inference.timeout_ms == 0 {
            return Err(anyhow::anyhow!("timeout_ms must be greater than 0"));
        }

        if self.limits.max_text_chars == 0
            || self.limits.max_translation_chars == 0
            || self.limits.max_batch_items == 0
        {
            return Err(anyhow::anyhow!("Input limits must be greater than 0"));
        }

        let template = &self.models.translation_template;
        if !template.contains("{src}") || !template.contains("{tgt}") {
            return Err(anyhow::anyhow!(
                "translation_template must contain {{src}} and {{tgt}}: {}",
                template
            ));
        }

        for (name, model) in [
            ("sentiment", &self.models.sentiment),
            ("ner", &self.models.ner),
            ("paraphrase", &self.models.paraphrase),
            ("summarization", &self.models.summarization),
        ] {
            if model.trim().is_empty() {
                return Err(anyhow::anyhow!("Model id for {} is required", name));
            }
        }

        self.rate_limits.parsed()?;
        self.rate_limits.default_limit.parse::<RateLimit>()?;

        if !self.rate_limits.enabled {
            warn!("Rate limiting is disabled");
        }

        Ok(())
    }
}
