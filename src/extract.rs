//! Pull the JSON payload out of a free-form completion.
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// First `[` through the last `]`, across lines.
static ARRAY_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid regex"));

const FENCE: &str = "```";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// A single JSON object is expected.
    Object,
    /// A JSON array of objects is expected, possibly surrounded by prose.
    Array,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("resposta da IA não é um JSON válido: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("nenhum JSON encontrado na resposta da IA")]
    NoJsonFound,
}

pub fn extract_json(raw: &str, mode: ExtractMode) -> Result<Value, ExtractError> {
    match mode {
        ExtractMode::Object => extract_object(raw),
        ExtractMode::Array => extract_array(raw),
    }
}

fn extract_object(raw: &str) -> Result<Value, ExtractError> {
    let trimmed = raw.trim();
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(err) if trimmed.contains(FENCE) => {
            debug!(%err, "retrying parse without code fences");
            Ok(serde_json::from_str(&strip_fences(trimmed))?)
        }
        Err(err) => Err(err.into()),
    }
}

fn extract_array(raw: &str) -> Result<Value, ExtractError> {
    let span = ARRAY_SPAN
        .find(raw)
        .ok_or(ExtractError::NoJsonFound)?
        .as_str();
    Ok(serde_json::from_str(span)?)
}

/// Remove markdown code-fence markers (```` ```json ```` and ```` ``` ````).
pub fn strip_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace(FENCE, "")
        .trim()
        .to_string()
}
