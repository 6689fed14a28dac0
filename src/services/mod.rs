//! Services that turn raw pipeline output into normalized responses

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::core::errors::{NlpError, Result};
use crate::core::models::{
    round_score, BatchSentimentResult, Entity, LabelScore, NerResponse, ParaphraseResponse,
    Sentiment, SentimentResponse, SummarizationResponse,
};
use crate::providers::{ModelProvider, TranslationProvider};

fn invalid(message: impl Into<String>) -> NlpError {
    NlpError::InvalidOutput {
        message: message.into(),
    }
}

fn parse_label_score(value: &Value) -> Result<LabelScore> {
    let label = value
        .get("label")
        .and_then(|l| l.as_str())
        .ok_or_else(|| invalid("sentiment result without label"))?;
    let score = value
        .get("score")
        .and_then(|s| s.as_f64())
        .ok_or_else(|| invalid("sentiment result without score"))?;

    Ok(LabelScore {
        label: label.to_string(),
        score,
    })
}

/// Pick the winning label from any of the shapes a sentiment pipeline returns
///
/// `[[{..}, {..}]]` takes the best scored entry, `[{..}, ..]` takes the
/// first, a bare object is taken as is.
pub fn normalize_sentiment(output: &Value) -> Result<SentimentResponse> {
    let (best, all_scores) = match output {
        Value::Array(items) => match items.first() {
            Some(Value::Array(inner)) => {
                let scores = inner
                    .iter()
                    .map(parse_label_score)
                    .collect::<Result<Vec<_>>>()?;
                let best = scores
                    .iter()
                    .max_by(|a, b| a.score.total_cmp(&b.score))
                    .cloned()
                    .ok_or_else(|| invalid("empty sentiment scores"))?;
                (best, Some(scores))
            }
            Some(_) => {
                let scores = items
                    .iter()
                    .map(parse_label_score)
                    .collect::<Result<Vec<_>>>()?;
                (scores[0].clone(), Some(scores))
            }
            None => return Err(invalid("empty sentiment output")),
        },
        Value::Object(_) => (parse_label_score(output)?, None),
        _ => return Err(invalid("unexpected sentiment output")),
    };

    Ok(SentimentResponse {
        sentiment: Sentiment::from_label(&best.label),
        confidence: round_score(best.score),
        all_scores,
    })
}

/// Convert token-classification output into entities
///
/// Aggregated output carries `word`/`entity_group`; raw output only `entity`.
pub fn normalize_entities(output: &Value) -> Result<Vec<Entity>> {
    let items = output
        .as_array()
        .ok_or_else(|| invalid("NER output is not a list"))?;

    items
        .iter()
        .map(|ent| {
            let raw_entity = ent.get("entity").and_then(|e| e.as_str());
            let text = ent
                .get("word")
                .and_then(|w| w.as_str())
                .or(raw_entity)
                .ok_or_else(|| invalid("entity without word"))?;
            let label = ent
                .get("entity_group")
                .and_then(|g| g.as_str())
                .or(raw_entity)
                .ok_or_else(|| invalid("entity without label"))?;
            let score = ent
                .get("score")
                .and_then(|s| s.as_f64())
                .ok_or_else(|| invalid("entity without score"))?;

            Ok(Entity {
                text: text.to_string(),
                label: label.to_string(),
                score: round_score(score),
            })
        })
        .collect()
}

/// First `key` string of a generation style output (`[{"summary_text": ..}]`)
pub fn first_text(output: &Value, key: &str) -> Result<String> {
    let first = match output {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(output),
        _ => None,
    };

    first
        .and_then(|item| item.get(key))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| invalid(format!("output has no '{}'", key)))
}

/// Sentiment analysis
#[derive(Clone)]
pub struct SentimentService {
    provider: Arc<ModelProvider>,
}

impl SentimentService {
    pub fn new(provider: Arc<ModelProvider>) -> Self {
        Self { provider }
    }

    pub async fn analyze(&self, text: &str) -> Result<SentimentResponse> {
        let output = self.provider.predict(text).await?;
        normalize_sentiment(&output)
    }

    /// Analyze each non-blank text in order
    pub async fn analyze_batch(&self, texts: &[String]) -> Result<Vec<BatchSentimentResult>> {
        let mut results = Vec::with_capacity(texts.len());

        for text in texts {
            if text.trim().is_empty() {
                debug!("Skipping blank batch entry");
                continue;
            }

            let analysis = self.analyze(text).await?;
            results.push(BatchSentimentResult {
                text: text.clone(),
                sentiment: analysis.sentiment,
                confidence: analysis.confidence,
            });
        }

        Ok(results)
    }
}

/// Named entity recognition
#[derive(Clone)]
pub struct NerService {
    provider: Arc<ModelProvider>,
}

impl NerService {
    pub fn new(provider: Arc<ModelProvider>) -> Self {
        Self { provider }
    }

    pub async fn extract_entities(&self, text: &str) -> Result<NerResponse> {
        let output = self.provider.predict(text).await?;
        Ok(NerResponse {
            entities: normalize_entities(&output)?,
            text: text.to_string(),
        })
    }
}

/// Translation between a language pair
#[derive(Clone)]
pub struct TranslationService {
    provider: Arc<TranslationProvider>,
}

impl TranslationService {
    pub fn new(provider: Arc<TranslationProvider>) -> Self {
        Self { provider }
    }

    pub async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let output = self.provider.predict(text, source_lang, target_lang).await?;
        first_text(&output, "translation_text")
    }
}

/// Paraphrasing
#[derive(Clone)]
pub struct ParaphraseService {
    provider: Arc<ModelProvider>,
}

impl ParaphraseService {
    pub fn new(provider: Arc<ModelProvider>) -> Self {
        Self { provider }
    }

    pub async fn paraphrase(&self, text: &str) -> Result<ParaphraseResponse> {
        let output = self.provider.predict(text).await?;
        Ok(ParaphraseResponse {
            paraphrased_text: first_text(&output, "generated_text")?,
        })
    }
}

/// Summarization
#[derive(Clone)]
pub struct SummarizationService {
    provider: Arc<ModelProvider>,
}

impl SummarizationService {
    pub fn new(provider: Arc<ModelProvider>) -> Self {
        Self { provider }
    }

    pub async fn summarize(&self, text: &str) -> Result<SummarizationResponse> {
        let output = self.provider.predict(text).await?;
        Ok(SummarizationResponse {
            summary_text: first_text(&output, "summary_text")?,
        })
    }
}
