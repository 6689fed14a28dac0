//! Input validation rules shared by request models

use regex::Regex;
use std::sync::OnceLock;

use crate::core::config::LimitSettings;
use crate::core::errors::{NlpError, Result};

/// Request bodies that check and normalize themselves before dispatch
pub trait Validate {
    /// Validate in place, trimming and normalizing fields as needed
    fn validate(&mut self, limits: &LimitSettings) -> Result<()>;
}

/// Trim `text` and enforce non-emptiness and a character budget
pub fn normalize_text(text: &str, field: &str, max_chars: usize) -> Result<String> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(NlpError::validation(format!(
            "{}: must not be empty or whitespace only",
            field
        )));
    }

    let chars = trimmed.chars().count();
    if chars > max_chars {
        return Err(NlpError::validation(format!(
            "{}: must be at most {} characters (got {})",
            field, max_chars, chars
        )));
    }

    Ok(trimmed.to_string())
}

fn lang_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,3}(?:-[A-Za-z]{1,2})?$").expect("language code pattern is valid")
    })
}

/// Check a language code (`en`, `zh`, `pt-br`) and lowercase it
pub fn normalize_lang_code(code: &str, field: &str) -> Result<String> {
    let code = code.trim();
    let len = code.chars().count();

    if !(2..=5).contains(&len) || !lang_pattern().is_match(code) {
        return Err(NlpError::validation(format!(
            "{}: '{}' is not a valid language code (expected 2-5 letters, e.g. 'en')",
            field, code
        )));
    }

    Ok(code.to_lowercase())
}
