//! Live channel wire format: the JSON frames exchanged over the WebSocket.
//!
//! Every frame is a JSON object carrying a string `type` tag plus arbitrary
//! other fields.  Inbound text is validated into a [`ChannelMessage`] at the
//! boundary; anything else is rejected with a [`FrameError`] instead of
//! being passed on as loosely-typed JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query parameter carrying the credential on the connect URL.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// A validated channel frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ChannelMessage {
    /// The frame's `type` tag (e.g. `"ping"`, `"task_update"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Every other top-level field of the frame.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Why an inbound frame was rejected.
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no `type` field")]
    MissingType,
    #[error("frame `type` is not a string")]
    InvalidType,
}

impl FrameError {
    /// Short machine-readable reason, used in trace events.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::NotAnObject => "not_an_object",
            Self::MissingType => "missing_type",
            Self::InvalidType => "invalid_type",
        }
    }
}

impl ChannelMessage {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    /// Add a top-level field.  A `type` key is ignored; use [`Self::kind`].
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "type" {
            self.fields.insert(key, value.into());
        }
        self
    }

    /// Parse and validate a raw text frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Validate an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, FrameError> {
        let Value::Object(mut fields) = value else {
            return Err(FrameError::NotAnObject);
        };
        match fields.remove("type") {
            Some(Value::String(kind)) => Ok(Self { kind, fields }),
            Some(_) => Err(FrameError::InvalidType),
            None => Err(FrameError::MissingType),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The frame as a single JSON object, `type` included.
    pub fn to_value(&self) -> Value {
        let mut obj = self.fields.clone();
        obj.insert("type".into(), Value::String(self.kind.clone()));
        Value::Object(obj)
    }
}

impl TryFrom<Value> for ChannelMessage {
    type Error = FrameError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_type() {
        let msg = ChannelMessage::parse(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg.kind, "ping");
        assert!(msg.fields.is_empty());
        assert_eq!(msg.to_value(), json!({"type": "ping"}));
    }

    #[test]
    fn keeps_extra_fields() {
        let msg =
            ChannelMessage::parse(r#"{"type":"task_update","task_id":"t1","progress":0.5}"#)
                .unwrap();
        assert_eq!(msg.kind, "task_update");
        assert_eq!(msg.get("task_id"), Some(&json!("t1")));
        assert_eq!(msg.get("progress"), Some(&json!(0.5)));
    }

    #[test]
    fn rejects_non_json() {
        let err = ChannelMessage::parse("not-json").unwrap_err();
        assert!(matches!(err, FrameError::InvalidJson(_)));
        assert_eq!(err.reason(), "invalid_json");
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(
            ChannelMessage::parse("[1,2,3]"),
            Err(FrameError::NotAnObject)
        ));
        assert!(matches!(
            ChannelMessage::parse(r#""ping""#),
            Err(FrameError::NotAnObject)
        ));
    }

    #[test]
    fn rejects_missing_or_non_string_type() {
        assert!(matches!(
            ChannelMessage::parse(r#"{"kind":"ping"}"#),
            Err(FrameError::MissingType)
        ));
        assert!(matches!(
            ChannelMessage::parse(r#"{"type":7}"#),
            Err(FrameError::InvalidType)
        ));
    }

    #[test]
    fn serializes_with_type_tag() {
        let msg = ChannelMessage::new("subscribe").with_field("topic", "agents");
        let text = serde_json::to_string(&msg).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, json!({"type": "subscribe", "topic": "agents"}));
    }

    #[test]
    fn with_field_cannot_override_type() {
        let msg = ChannelMessage::new("a").with_field("type", "b");
        assert_eq!(msg.kind, "a");
        assert!(msg.get("type").is_none());
    }

    #[test]
    fn deserialize_goes_through_validation() {
        let ok: ChannelMessage = serde_json::from_value(json!({"type": "x", "n": 1})).unwrap();
        assert_eq!(ok.kind, "x");
        assert!(serde_json::from_value::<ChannelMessage>(json!({"n": 1})).is_err());
    }
}
