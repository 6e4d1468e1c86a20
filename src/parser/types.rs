//! Parser types shared by the decoder and the session builder

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a message.
///
/// Unknown role strings are preserved so they still count toward totals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    System,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Other(s) => s,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => Role::Other(s),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// One turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,

    /// Always resolved to a single string (empty when no text was found)
    pub content: String,

    /// Raw timestamp string; compared lexicographically, never parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// An ordered run of messages from one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub messages: Vec<Message>,
    /// When this record was materialized, not when the conversation happened
    pub created_at: String,
}

/// The shapes a message body takes in the wild
#[derive(Debug, Clone, PartialEq)]
pub enum RawContent {
    /// `"content": "text"`
    Text(String),
    /// `"content": [{"type": "text", "text": "..."}, ...]`
    Fragments(Vec<String>),
    /// `"content": {"content": ...}`
    Nested(Box<RawContent>),
    /// Anything else; normalizes to an empty string
    Other(Value),
}

impl RawContent {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => RawContent::Text(s),
            Value::Array(items) => RawContent::Fragments(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        Value::Object(mut obj) => match obj.remove("text") {
                            Some(Value::String(s)) => Some(s),
                            _ => None,
                        },
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Object(mut obj) => {
                if let Some(inner) = obj.remove("content") {
                    RawContent::Nested(Box::new(RawContent::from_value(inner)))
                } else if let Some(Value::String(text)) = obj.remove("text") {
                    RawContent::Text(text)
                } else {
                    RawContent::Other(Value::Object(obj))
                }
            }
            other => RawContent::Other(other),
        }
    }

    /// Collapse into the canonical single string
    pub fn into_text(self) -> String {
        match self {
            RawContent::Text(s) => s,
            RawContent::Fragments(parts) => parts.join(" "),
            RawContent::Nested(inner) => inner.into_text(),
            RawContent::Other(_) => String::new(),
        }
    }
}

/// Line-level counters collected while building sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Physical lines read
    pub lines: usize,
    pub blank_lines: usize,
    /// Lines that were not valid JSON
    pub malformed_lines: usize,
    /// Valid JSON that did not look like a message
    pub ignored_lines: usize,
    pub messages: usize,
}

/// Result of parsing one file or string
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    /// Zero or one session today; see `SessionBuilder`
    pub sessions: Vec<Session>,

    pub stats: ParseStats,

    /// One entry per malformed line
    pub errors: Vec<String>,
}
