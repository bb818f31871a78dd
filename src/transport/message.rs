//! Wire messages
//!
//! Every frame is one JSON object tagged by its `type` field. Inbound frames
//! decode into the closed `ClientMessage` enum; anything that does not fit
//! comes back as a `DecodeError` which the connection handler logs and
//! drops without replying.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const KNOWN_KINDS: [&str; 4] = ["subscribe", "unsubscribe", "publish", "ping"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe {
        #[serde(default, deserialize_with = "string_entries")]
        topics: Vec<String>,
    },
    Unsubscribe {
        #[serde(default, deserialize_with = "string_entries")]
        topics: Vec<String>,
    },
    Publish(PublishFrame),
    Ping {},
}

/// A publish request. Everything besides `type` and `topic` is opaque to
/// the relay and forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishFrame {
    pub topic: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PublishFrame {
    /// The frame as sent to subscribers: the original message with
    /// `clients` set to the number of receivers.
    pub fn into_outgoing(self, clients: usize) -> Value {
        let mut out = self.fields;
        out.insert("type".to_string(), Value::from("publish"));
        out.insert("topic".to_string(), Value::from(self.topic));
        out.insert("clients".to_string(), Value::from(clients));
        Value::Object(out)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Pong {},
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no message type")]
    MissingKind,
    #[error("unknown message type {0}")]
    UnknownKind(String),
}

impl ClientMessage {
    /// Decode a text frame.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// Decode a binary frame holding UTF-8 JSON.
    pub fn decode_slice(raw: &[u8]) -> Result<Self, DecodeError> {
        Self::from_value(serde_json::from_slice(raw)?)
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        let Value::Object(ref obj) = value else {
            return Err(DecodeError::NotAnObject);
        };

        match obj.get("type") {
            None => return Err(DecodeError::MissingKind),
            Some(kind) if is_falsy(kind) => return Err(DecodeError::MissingKind),
            Some(Value::String(kind)) if KNOWN_KINDS.contains(&kind.as_str()) => {}
            Some(Value::String(kind)) => return Err(DecodeError::UnknownKind(kind.clone())),
            Some(other) => return Err(DecodeError::UnknownKind(other.to_string())),
        }

        Ok(serde_json::from_value(value)?)
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// `topics` may be absent or null (no topics) and may mix in non-string
/// entries, which are skipped.
fn string_entries<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(name) => Some(name),
            _ => None,
        })
        .collect())
}
