//! HTTP API server implementation

use axum::{
    extract::State,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::core::client::InferenceClient;
use crate::core::config::{LimitSettings, ServerSettings, ServiceConfig};
use crate::core::models::{
    BatchSentimentResponse, BatchSentimentResult, BatchTextInput, Entity, LabelScore, NerResponse,
    ParaphraseResponse, Sentiment, SentimentResponse, SummarizationResponse, TextInput,
    TranslationInput, TranslationResponse,
};
use crate::core::pipeline::{PipelineLoader, RemoteLoader};
use crate::core::rate_limiter::RateLimiter;
use crate::providers::{ModelRegistry, ProviderStatus};
use crate::server::auth::require_api_key;
use crate::server::error::{ApiError, ErrorBody};
use crate::server::extract::{ClientAddr, ValidatedJson};
use crate::services::{
    NerService, ParaphraseService, SentimentService, SummarizationService, TranslationService,
};

/// Application state
pub struct AppState {
    pub registry: ModelRegistry,
    pub sentiment: SentimentService,
    pub ner: NerService,
    pub translation: TranslationService,
    pub paraphrase: ParaphraseService,
    pub summarization: SummarizationService,
    pub limiter: RateLimiter,
    pub limits: LimitSettings,
    pub api_key: Option<String>,
}

impl AppState {
    /// Wire providers and services for `config` on top of `loader`
    pub fn new(config: &ServiceConfig, loader: Arc<dyn PipelineLoader>) -> anyhow::Result<Self> {
        let registry = ModelRegistry::from_settings(&config.models, loader);
        let limiter = RateLimiter::from_settings(&config.rate_limits)?;

        Ok(Self {
            sentiment: SentimentService::new(registry.sentiment.clone()),
            ner: NerService::new(registry.ner.clone()),
            translation: TranslationService::new(registry.translation.clone()),
            paraphrase: ParaphraseService::new(registry.paraphrase.clone()),
            summarization: SummarizationService::new(registry.summarization.clone()),
            registry,
            limiter,
            limits: config.limits.clone(),
            api_key: config.server.api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

/// Root status response
#[derive(Serialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` when every eager model is loaded, `degraded` otherwise
    pub status: String,
    pub models: ModelHealth,
}

#[derive(Serialize, ToSchema)]
pub struct ModelHealth {
    pub sentiment: bool,
    pub ner: bool,
    pub paraphrase: bool,
    pub summarization: bool,
}

/// Models list response
#[derive(Serialize, ToSchema)]
pub struct ModelsResponse {
    pub models: Vec<ProviderStatus>,
    pub translation: TranslationStatus,
}

#[derive(Serialize, ToSchema)]
pub struct TranslationStatus {
    pub model_template: String,
    pub loaded_pairs: Vec<String>,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "NLP Analysis API",
        description = "Sentiment analysis, NER, translation, paraphrasing and summarization with pretrained models"
    ),
    paths(
        root,
        health_check,
        list_models,
        analyze_sentiment,
        analyze_batch_sentiment,
        extract_entities,
        translate_text,
        paraphrase_text,
        summarize_text
    ),
    components(schemas(
        TextInput,
        BatchTextInput,
        TranslationInput,
        Sentiment,
        LabelScore,
        SentimentResponse,
        BatchSentimentResult,
        BatchSentimentResponse,
        Entity,
        NerResponse,
        TranslationResponse,
        ParaphraseResponse,
        SummarizationResponse,
        ErrorBody,
        RootResponse,
        HealthResponse,
        ModelHealth,
        ModelsResponse,
        TranslationStatus,
        ProviderStatus
    ))
)]
pub struct ApiDoc;

/// Basic API status endpoint
#[utoipa::path(get, path = "/", responses((status = 200, body = RootResponse)))]
async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "NLP Analysis API is running!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Model load state per task
#[utoipa::path(get, path = "/health", responses((status = 200, body = HealthResponse)))]
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let registry = &state.registry;
    let models = ModelHealth {
        sentiment: registry.sentiment.is_loaded().await,
        ner: registry.ner.is_loaded().await,
        paraphrase: registry.paraphrase.is_loaded().await,
        summarization: registry.summarization.is_loaded().await,
    };

    let healthy = models.sentiment && models.ner && models.paraphrase && models.summarization;

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        models,
    })
}

/// Configured and active models
#[utoipa::path(get, path = "/models", responses((status = 200, body = ModelsResponse)))]
async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let translation = &state.registry.translation;
    Json(ModelsResponse {
        models: state.registry.statuses().await,
        translation: TranslationStatus {
            model_template: translation.template().to_string(),
            loaded_pairs: translation.loaded_pairs().await,
        },
    })
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Analyze the sentiment of the provided text
#[utoipa::path(
    post,
    path = "/analyze",
    request_body = TextInput,
    responses(
        (status = 200, body = SentimentResponse),
        (status = 422, body = ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, body = ErrorBody)
    )
)]
async fn analyze_sentiment(
    State(state): State<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    ValidatedJson(input): ValidatedJson<TextInput>,
) -> Result<Json<SentimentResponse>, ApiError> {
    state.limiter.check("/analyze", &client).await?;

    let response = state
        .sentiment
        .analyze(&input.text)
        .await
        .map_err(|e| ApiError::operation("Analysis", e))?;

    Ok(Json(response))
}

/// Analyze sentiment for multiple texts at once
#[utoipa::path(
    post,
    path = "/analyze-batch",
    request_body = BatchTextInput,
    responses(
        (status = 200, body = BatchSentimentResponse),
        (status = 422, body = ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, body = ErrorBody)
    )
)]
async fn analyze_batch_sentiment(
    State(state): State<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    ValidatedJson(input): ValidatedJson<BatchTextInput>,
) -> Result<Json<BatchSentimentResponse>, ApiError> {
    state.limiter.check("/analyze-batch", &client).await?;

    let results = state
        .sentiment
        .analyze_batch(&input.texts)
        .await
        .map_err(|e| ApiError::operation("Batch analysis", e))?;

    Ok(Json(BatchSentimentResponse { results }))
}

/// Extract named entities from the provided text
#[utoipa::path(
    post,
    path = "/ner",
    request_body = TextInput,
    responses(
        (status = 200, body = NerResponse),
        (status = 422, body = ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, body = ErrorBody)
    )
)]
async fn extract_entities(
    State(state): State<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    ValidatedJson(input): ValidatedJson<TextInput>,
) -> Result<Json<NerResponse>, ApiError> {
    state.limiter.check("/ner", &client).await?;

    let response = state
        .ner
        .extract_entities(&input.text)
        .await
        .map_err(|e| ApiError::operation("NER", e))?;

    Ok(Json(response))
}

/// Translate text from source language to target language
#[utoipa::path(
    post,
    path = "/translate",
    request_body = TranslationInput,
    responses(
        (status = 200, body = TranslationResponse),
        (status = 400, body = ErrorBody, description = "No model for the language pair"),
        (status = 422, body = ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, body = ErrorBody)
    )
)]
async fn translate_text(
    State(state): State<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    ValidatedJson(input): ValidatedJson<TranslationInput>,
) -> Result<Json<TranslationResponse>, ApiError> {
    state.limiter.check("/translate", &client).await?;

    let translated_text = state
        .translation
        .translate(&input.text, &input.source_lang, &input.target_lang)
        .await
        .map_err(|e| {
            warn!(
                "Translation {}-{} failed: {}",
                input.source_lang, input.target_lang, e
            );
            ApiError::operation("Translation", e)
        })?;

    Ok(Json(TranslationResponse { translated_text }))
}

/// Paraphrase the provided text
#[utoipa::path(
    post,
    path = "/paraphrase",
    request_body = TextInput,
    responses(
        (status = 200, body = ParaphraseResponse),
        (status = 422, body = ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, body = ErrorBody)
    )
)]
async fn paraphrase_text(
    State(state): State<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    ValidatedJson(input): ValidatedJson<TextInput>,
) -> Result<Json<ParaphraseResponse>, ApiError> {
    state.limiter.check("/paraphrase", &client).await?;

    let response = state
        .paraphrase
        .paraphrase(&input.text)
        .await
        .map_err(|e| ApiError::operation("Paraphrasing", e))?;

    Ok(Json(response))
}

/// Summarize the provided text
#[utoipa::path(
    post,
    path = "/summarize",
    request_body = TextInput,
    responses(
        (status = 200, body = SummarizationResponse),
        (status = 422, body = ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, body = ErrorBody)
    )
)]
async fn summarize_text(
    State(state): State<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    ValidatedJson(input): ValidatedJson<TextInput>,
) -> Result<Json<SummarizationResponse>, ApiError> {
    state.limiter.check("/summarize", &client).await?;

    let response = state
        .summarization
        .summarize(&input.text)
        .await
        .map_err(|e| ApiError::operation("Summarization", e))?;

    Ok(Json(response))
}

fn cors_layer(settings: &ServerSettings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match settings.allowed_origins() {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin: {}", origin);
                        None
                    }
                })
                .collect();
            layer.allow_origin(origins)
        }
    }
}

/// Build the router: public status routes plus the rate limited NLP routes
pub fn build_app(state: Arc<AppState>, settings: &ServerSettings) -> Router {
    let nlp_routes = Router::new()
        .route("/analyze", post(analyze_sentiment))
        .route("/analyze-batch", post(analyze_batch_sentiment))
        .route("/ner", post(extract_entities))
        .route("/translate", post(translate_text))
        .route("/paraphrase", post(paraphrase_text))
        .route("/summarize", post(summarize_text))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/models", get(list_models))
        .route("/openapi.json", get(openapi_json))
        .merge(nlp_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(settings))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Run the HTTP server
pub async fn run_server(config: ServiceConfig) -> anyhow::Result<()> {
    // Create inference backend
    let client = InferenceClient::new(config.inference.clone())?;
    let loader: Arc<dyn PipelineLoader> = Arc::new(RemoteLoader::new(client));

    // Create app state
    let state = Arc::new(AppState::new(&config, loader)?);

    if config.models.preload {
        state.registry.load_all(config.models.strict_startup).await?;
    } else {
        info!("Model preloading disabled, models load on first request");
    }

    let app = build_app(state, &config.server);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Starting server on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
