//! Line record decoder
//!
//! Turns one physical JSONL line into at most one [`Message`].

use super::types::{Message, RawContent, Role};
use serde_json::{Map, Value};

/// What a single line turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum LineRecord {
    Blank,
    /// Not valid JSON; carries the parser error
    Malformed(String),
    /// Valid JSON that is not a message record
    Ignored,
    Message(Message),
}

/// Decode one line.
///
/// A record is a message when it has `"type": "message"` or a truthy `role`.
/// Content comes from `content`, then `text`; the timestamp from `timestamp`,
/// then `created_at`. Empty strings and nulls fall through to the next source.
pub fn decode_line(line: &str) -> LineRecord {
    if line.trim().is_empty() {
        return LineRecord::Blank;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return LineRecord::Malformed(e.to_string()),
    };

    let Value::Object(mut obj) = value else {
        return LineRecord::Ignored;
    };

    let is_message = obj.get("type").and_then(|t| t.as_str()) == Some("message");
    let has_role = obj.get("role").is_some_and(is_truthy);
    if !is_message && !has_role {
        return LineRecord::Ignored;
    }

    let role = match take_truthy(&mut obj, &["role"]) {
        Some(Value::String(s)) => Role::from(s),
        Some(other) => Role::Other(other.to_string()),
        None => Role::User,
    };

    let content = take_truthy(&mut obj, &["content", "text"])
        .map(|v| RawContent::from_value(v).into_text())
        .unwrap_or_default();

    let timestamp = take_truthy(&mut obj, &["timestamp", "created_at"]).map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    });

    LineRecord::Message(Message {
        role,
        content,
        timestamp,
    })
}

/// First of `keys` whose value is truthy, removed from the object
fn take_truthy(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    let key = keys
        .iter()
        .find(|k| obj.get(**k).is_some_and(is_truthy))?;
    obj.remove(*key)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
