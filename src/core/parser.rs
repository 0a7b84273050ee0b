use crate::domain::model::Record;
use serde_json::{Map, Value};

/// Decodes shell output expected to hold a JSON array of documents.
///
/// Returns `None` when the text is not valid JSON or not an array. Elements
/// that are not objects are dropped.
pub fn parse_json_array(text: &str) -> Option<Vec<Record>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(data) => Some(Record { data }),
                    _ => None,
                })
                .collect(),
        ),
        Ok(other) => {
            tracing::debug!("Expected a JSON array, got {}", type_name(&other));
            None
        }
        Err(e) => {
            tracing::debug!("JSON decode failed: {}", e);
            None
        }
    }
}

/// Decodes a single JSON document such as a command reply.
pub fn parse_json_document(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(doc)) => Some(doc),
        _ => None,
    }
}

/// Reads an integer count from the last non-empty line of shell output.
pub fn parse_count(text: &str) -> Option<u64> {
    text.lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .and_then(|line| line.parse().ok())
}

/// Shortens operator-facing output to `max_chars` characters.
pub fn truncate_display(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
