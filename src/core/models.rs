//! Request and response models for the NLP endpoints

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::core::config::LimitSettings;
use crate::core::errors::{NlpError, Result};
use crate::core::validation::{normalize_lang_code, normalize_text, Validate};

/// Input for single-text operations
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TextInput {
    /// The text to process
    pub text: String,
}

impl TextInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Validate for TextInput {
    fn validate(&mut self, limits: &LimitSettings) -> Result<()> {
        self.text = normalize_text(&self.text, "text", limits.max_text_chars)?;
        Ok(())
    }
}

/// Input for batch sentiment analysis
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchTextInput {
    /// List of texts to process
    pub texts: Vec<String>,
}

impl Validate for BatchTextInput {
    fn validate(&mut self, limits: &LimitSettings) -> Result<()> {
        if self.texts.is_empty() {
            return Err(NlpError::validation("texts: must contain at least 1 item"));
        }

        if self.texts.len() > limits.max_batch_items {
            return Err(NlpError::validation(format!(
                "texts: must contain at most {} items (got {})",
                limits.max_batch_items,
                self.texts.len()
            )));
        }

        // Blank entries are allowed here and skipped by the service
        for (i, text) in self.texts.iter().enumerate() {
            let chars = text.trim().chars().count();
            if chars > limits.max_text_chars {
                return Err(NlpError::validation(format!(
                    "texts[{}]: must be at most {} characters (got {})",
                    i, limits.max_text_chars, chars
                )));
            }
        }

        Ok(())
    }
}

fn default_source_lang() -> String {
    "en".to_string()
}

fn default_target_lang() -> String {
    "ar".to_string()
}

/// Input for translation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranslationInput {
    /// The text to translate
    pub text: String,
    /// Source language code
    #[serde(default = "default_source_lang")]
    #[schema(default = "en")]
    pub source_lang: String,
    /// Target language code
    #[serde(default = "default_target_lang")]
    #[schema(default = "ar")]
    pub target_lang: String,
}

impl TranslationInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
        }
    }

    pub fn with_langs(mut self, source_lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        self.source_lang = source_lang.into();
        self.target_lang = target_lang.into();
        self
    }
}

impl Validate for TranslationInput {
    fn validate(&mut self, limits: &LimitSettings) -> Result<()> {
        self.text = normalize_text(&self.text, "text", limits.max_translation_chars)?;
        self.source_lang = normalize_lang_code(&self.source_lang, "source_lang")?;
        self.target_lang = normalize_lang_code(&self.target_lang, "target_lang")?;

        if self.source_lang == self.target_lang {
            return Err(NlpError::validation(
                "target_lang: must differ from source_lang",
            ));
        }

        Ok(())
    }
}

/// Normalized sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Map a raw model label (`positive`, `NEGATIVE`, `neutral`, ...) onto the three classes
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("positive") {
            Sentiment::Positive
        } else if label.contains("negative") {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "Positive"),
            Sentiment::Negative => write!(f, "Negative"),
            Sentiment::Neutral => write!(f, "Neutral"),
        }
    }
}

/// One raw label score reported by the sentiment model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Response for sentiment analysis
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SentimentResponse {
    pub sentiment: Sentiment,
    /// Score of the winning label, rounded to 3 decimals
    pub confidence: f64,
    pub all_scores: Option<Vec<LabelScore>>,
}

/// Result for a single text in batch analysis
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchSentimentResult {
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f64,
}

/// Response for batch sentiment analysis
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchSentimentResponse {
    pub results: Vec<BatchSentimentResult>,
}

/// A named entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Entity {
    pub text: String,
    pub label: String,
    pub score: f64,
}

/// Response for named entity recognition
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NerResponse {
    pub entities: Vec<Entity>,
    /// The original text
    pub text: String,
}

/// Response for translation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TranslationResponse {
    pub translated_text: String,
}

/// Response for paraphrasing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParaphraseResponse {
    pub paraphrased_text: String,
}

/// Response for summarization
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SummarizationResponse {
    pub summary_text: String,
}

/// Round a score to 3 decimals
///
/// Rounds the exact binary value, so `0.1235` (stored just below the tie)
/// becomes `0.123`.
pub fn round_score(score: f64) -> f64 {
    format!("{:.3}", score).parse().unwrap_or(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> LimitSettings {
        LimitSettings::default()
    }

    #[test]
    fn test_text_input_strips_whitespace() {
        let mut input = TextInput::new("  text with spaces  ");
        input.validate(&limits()).unwrap();
        assert_eq!(input.text, "text with spaces");
    }

    #[test]
    fn test_text_input_too_long_fails() {
        let mut input = TextInput::new("a".repeat(6000));
        assert!(input.validate(&limits()).is_err());
    }

    #[test]
    fn test_batch_input_bounds() {
        let mut empty = BatchTextInput { texts: vec![] };
        assert!(empty.validate(&limits()).is_err());

        let mut too_many = BatchTextInput {
            texts: vec!["text".to_string(); 101],
        };
        assert!(too_many.validate(&limits()).is_err());

        let mut at_limit = BatchTextInput {
            texts: vec!["text".to_string(); 100],
        };
        assert!(at_limit.validate(&limits()).is_ok());

        let mut long_item = BatchTextInput {
            texts: vec!["ok".to_string(), "a".repeat(5001)],
        };
        let err = long_item.validate(&limits()).unwrap_err();
        assert!(err.to_string().starts_with("texts[1]"));
    }

    #[test]
    fn test_translation_input_defaults() {
        let input: TranslationInput = serde_json::from_str(r#"{"text": "Hello"}"#).unwrap();
        assert_eq!(input.source_lang, "en");
        assert_eq!(input.target_lang, "ar");
    }

    #[test]
    fn test_translation_input_validation() {
        let mut input = TranslationInput::new("Hello").with_langs("EN", "es");
        input.validate(&limits()).unwrap();
        assert_eq!(input.source_lang, "en");

        let mut bad_code = TranslationInput::new("Hello").with_langs("toolongcode", "es");
        assert!(bad_code.validate(&limits()).is_err());

        let mut same = TranslationInput::new("Hello").with_langs("en", "en");
        assert!(same.validate(&limits()).is_err());

        let mut too_long = TranslationInput::new("a".repeat(3001)).with_langs("en", "es");
        assert!(too_long.validate(&limits()).is_err());
    }

    #[test]
    fn test_sentiment_label_mapping() {
        assert_eq!(Sentiment::from_label("positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label("NEGATIVE"), Sentiment::Negative);
        assert_eq!(Sentiment::from_label("neutral"), Sentiment::Neutral);
        assert_eq!(Sentiment::from_label("LABEL_1"), Sentiment::Neutral);
        assert_eq!(
            serde_json::to_string(&Sentiment::Positive).unwrap(),
            "\"Positive\""
        );
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(0.98765), 0.988);
        assert_eq!(round_score(0.1234), 0.123);
        assert_eq!(round_score(1.0), 1.0);

        // Values stored just below the half-way point round down
        assert_eq!(round_score(0.1235), 0.123);
        assert_eq!(round_score(0.2345), 0.234);
        assert_eq!(round_score(0.6785), 0.678);
        assert_eq!(round_score(0.8885), 0.888);
    }
}
