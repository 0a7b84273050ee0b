use crate::utils::error::{EtlError, Result};
use serde_json::Value;

/// A row destined for a wide-column table: row key plus `family:qualifier` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HBaseRow {
    pub row_key: String,
    pub cells: Vec<(String, String)>,
}

impl HBaseRow {
    pub fn new(row_key: impl Into<String>, cells: &[(&str, &str)]) -> Self {
        Self {
            row_key: row_key.into(),
            cells: cells
                .iter()
                .map(|(c, v)| (c.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Column families written by [`SessionRecord::cells`].
pub const SESSION_FAMILIES: [&str; 5] = ["meta", "geo", "device", "stats", "events"];

/// One user session as read from a `sessions_*.json` export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: String,
    pub timestamp: String,
    pub city: String,
    pub country: String,
    pub device_type: String,
    pub duration: String,
    pub events: String,
}

fn field_text(obj: &serde_json::Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn random_row_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..16].to_string()
}

impl SessionRecord {
    /// Maps one JSON object; non-objects yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let session_id = match obj.get("session_id") {
            None | Some(Value::Null) => random_row_key(),
            Some(_) => field_text(obj, "session_id", ""),
        };
        let events = match obj.get("events") {
            None | Some(Value::Null) => "[]".to_string(),
            Some(events) => events.to_string(),
        };
        Some(Self {
            session_id,
            user_id: field_text(obj, "user_id", ""),
            timestamp: field_text(obj, "timestamp", ""),
            city: field_text(obj, "city", ""),
            country: field_text(obj, "country", ""),
            device_type: field_text(obj, "device_type", ""),
            duration: field_text(obj, "duration", "0"),
            events,
        })
    }

    pub fn cells(&self) -> [(&'static str, &str); 7] {
        [
            ("meta:user_id", self.user_id.as_str()),
            ("meta:timestamp", self.timestamp.as_str()),
            ("geo:city", self.city.as_str()),
            ("geo:country", self.country.as_str()),
            ("device:type", self.device_type.as_str()),
            ("stats:duration", self.duration.as_str()),
            ("events:log", self.events.as_str()),
        ]
    }
}

impl From<&SessionRecord> for HBaseRow {
    fn from(session: &SessionRecord) -> Self {
        HBaseRow::new(session.session_id.clone(), &session.cells())
    }
}

/// Parses a session export holding either an array or a single object.
pub fn parse_session_file(bytes: &[u8]) -> Result<Vec<SessionRecord>> {
    let value: Value = serde_json::from_slice(bytes)?;
    let items = match value {
        Value::Array(items) => items,
        single @ Value::Object(_) => vec![single],
        other => {
            return Err(EtlError::ProcessingError {
                message: format!("expected a session object or array, found {}", other),
            })
        }
    };
    Ok(items.iter().filter_map(SessionRecord::from_json).collect())
}
