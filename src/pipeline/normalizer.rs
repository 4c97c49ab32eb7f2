//! Response Normalizer
//!
//! Models wrap JSON in markdown fences more often than not. The fence is
//! stripped for parsing only: when parsing fails, the report keeps the text
//! exactly as the model returned it.

use crate::report::ReportResult;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Outcome of normalizing one model reply
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub result: ReportResult,
    pub parse_error: Option<String>,
}

impl Normalized {
    pub fn is_degraded(&self) -> bool {
        self.parse_error.is_some()
    }
}

/// Removes at most one leading fence (` ```json ` or bare ` ``` `) and one trailing fence
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(JSON_FENCE) {
        text = rest.trim();
    } else if let Some(rest) = text.strip_prefix(FENCE) {
        text = rest.trim();
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest.trim();
    }
    text
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, found {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn normalize(raw: &str) -> Normalized {
    let cleaned = strip_code_fence(raw);
    match parse_object(cleaned) {
        Ok(map) => {
            debug!(keys = map.len(), "Parsed model output as JSON");
            Normalized {
                result: ReportResult::Structured(map),
                parse_error: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "Model output was not valid JSON, storing raw text");
            Normalized {
                result: ReportResult::Raw(raw.to_string()),
                parse_error: Some(format!(
                    "Model output was not valid JSON after cleaning: {}",
                    e
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("  ```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_only_one_fence_each_side() {
        assert_eq!(strip_code_fence("```json\n```json\n{}\n```\n```"), "```json\n{}\n```");
    }

    #[test]
    fn test_fenced_json_becomes_structured() {
        let normalized = normalize("```json\n{\"a\": 1}\n```");
        assert!(!normalized.is_degraded());
        let ReportResult::Structured(map) = normalized.result else {
            panic!("expected structured result");
        };
        assert_eq!(Value::Object(map), json!({"a": 1}));
    }

    #[test]
    fn test_prose_keeps_original_text() {
        let raw = "Sure, here you go: {\"a\": 1}";
        let normalized = normalize(raw);
        assert_eq!(normalized.result, ReportResult::Raw(raw.to_string()));
        let err = normalized.parse_error.unwrap();
        assert!(err.starts_with("Model output was not valid JSON after cleaning:"));
    }

    #[test]
    fn test_fallback_stores_unstripped_text() {
        let raw = "```json\n{\"a\": \n```";
        let normalized = normalize(raw);
        assert_eq!(normalized.result.as_raw(), Some(raw));
        assert!(normalized.is_degraded());
    }

    #[test]
    fn test_non_object_json_is_degraded() {
        let normalized = normalize("[1, 2, 3]");
        assert_eq!(normalized.result.as_raw(), Some("[1, 2, 3]"));
        assert!(normalized.parse_error.unwrap().contains("an array"));
    }
}
