//! Session document model
//!
//! Session files are open JSON records. Only `transcript` and `messages`
//! carry meaning for the pipeline; everything else travels as metadata.

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Keys never forwarded as ingest metadata
const TRANSCRIPT_KEY: &str = "transcript";
const MESSAGES_KEY: &str = "messages";
const SESSION_ID_KEY: &str = "session_id";

/// Speaker of an interview message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Assistant,
    User,
    Other(String),
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "assistant" => Role::Assistant,
            "user" => Role::User,
            other => Role::Other(other.to_string()),
        }
    }
}

/// One entry of a session's `messages` sequence
///
/// Entries that are not objects, or whose fields are not strings, decode
/// with the corresponding field absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    pub role: Option<Role>,
    pub content: Option<String>,
}

impl Message {
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self {
            role: obj.get("role").and_then(Value::as_str).map(Role::from),
            content: obj
                .get("content")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Source of a session's canonical transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Non-blank `transcript` field, used verbatim
    Direct(String),
    /// Non-empty `messages` sequence, joined on demand
    FromMessages(Vec<Message>),
    None,
}

impl Transcript {
    /// Classify a session record. A non-blank `transcript` always wins over
    /// `messages`.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        if let Some(text) = fields.get(TRANSCRIPT_KEY).and_then(Value::as_str) {
            if !text.trim().is_empty() {
                return Transcript::Direct(text.to_string());
            }
        }

        match fields.get(MESSAGES_KEY).and_then(Value::as_array) {
            Some(items) if !items.is_empty() => {
                Transcript::FromMessages(items.iter().map(Message::from_value).collect())
            }
            _ => Transcript::None,
        }
    }

    /// Render the canonical transcript string
    ///
    /// Message contents are joined with a single space in encountered order,
    /// skipping messages without content. Returns `None` when the result
    /// would be blank.
    pub fn canonical(&self) -> Option<String> {
        match self {
            Transcript::Direct(text) => Some(text.clone()),
            Transcript::FromMessages(messages) => {
                let joined = messages
                    .iter()
                    .filter_map(|m| m.content.as_deref())
                    .collect::<Vec<_>>()
                    .join(" ");
                if joined.trim().is_empty() {
                    None
                } else {
                    Some(joined)
                }
            }
            Transcript::None => None,
        }
    }
}

/// A decoded session keyed by its session id
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl SessionDocument {
    /// Build a session from a decoded JSON value; anything but an object is malformed
    pub fn from_value(id: impl Into<String>, value: Value) -> Result<Self> {
        let id = id.into();
        match value {
            Value::Object(fields) => Ok(Self { id, fields }),
            other => Err(Error::MalformedSession {
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
                id,
            }),
        }
    }

    /// Decode raw file bytes
    pub fn from_slice(id: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let id = id.into();
        let value: Value = serde_json::from_slice(bytes).map_err(|e| Error::MalformedSession {
            id: id.clone(),
            reason: e.to_string(),
        })?;
        Self::from_value(id, value)
    }

    pub fn transcript(&self) -> Transcript {
        Transcript::from_fields(&self.fields)
    }

    /// Canonical transcript, if the session is transcribable
    pub fn canonical_transcript(&self) -> Option<String> {
        self.transcript().canonical()
    }

    /// Outbound ingest metadata
    ///
    /// Shallow copy without `transcript`, `messages` and null-valued fields.
    /// `session_id` is filled from the session id when the record lacks one.
    pub fn metadata(&self) -> Map<String, Value> {
        let mut metadata: Map<String, Value> = self
            .fields
            .iter()
            .filter(|(key, value)| {
                key.as_str() != TRANSCRIPT_KEY && key.as_str() != MESSAGES_KEY && !value.is_null()
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if !metadata.contains_key(SESSION_ID_KEY) {
            metadata.insert(SESSION_ID_KEY.to_string(), Value::String(self.id.clone()));
        }
        metadata
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
