//! Socket message envelope.
//!
//! Every frame exchanged with the server is a JSON object:
//!
//! ```json
//! { "name": "get_playback_overview", "type": "request", "id": "…", "options": { } }
//! ```
//!
//! Options form a flat key-value structure whose values may be strings,
//! numbers, booleans, nested objects or arrays.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::{RemoteError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Request,
    Response,
    Broadcast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketMessage {
    pub name: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub id: String,
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl SocketMessage {
    fn new(name: &str, message_type: MessageType, id: String) -> Self {
        Self {
            name: name.to_string(),
            message_type,
            id,
            options: Map::new(),
        }
    }

    /// New request with a fresh message id.
    pub fn request(name: &str) -> Self {
        Self::new(name, MessageType::Request, Uuid::new_v4().to_string())
    }

    pub fn broadcast(name: &str) -> Self {
        Self::new(name, MessageType::Broadcast, Uuid::new_v4().to_string())
    }

    /// Empty response carrying the name and id of this request.
    pub fn response_to(&self) -> Self {
        Self::new(&self.name, MessageType::Response, self.id.clone())
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn set_option(&mut self, key: &str, value: impl Into<Value>) {
        self.options.insert(key.to_string(), value.into());
    }

    /// Parses a frame received from the socket.
    pub fn parse(text: &str) -> Result<Self> {
        let message: SocketMessage = serde_json::from_str(text)
            .map_err(|err| RemoteError::Protocol(format!("malformed frame: {err}")))?;

        if message.name.is_empty() || message.id.is_empty() {
            return Err(RemoteError::protocol("frame without name or id"));
        }

        Ok(message)
    }

    pub fn to_json(&self) -> String {
        // Map<String, Value> always serializes
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn is_broadcast(&self) -> bool {
        self.message_type == MessageType::Broadcast
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn string_option(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn i64_option(&self, key: &str) -> Option<i64> {
        match self.options.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            _ => None,
        }
    }

    pub fn usize_option(&self, key: &str) -> Option<usize> {
        self.i64_option(key)
            .and_then(|n| usize::try_from(n).ok())
    }

    pub fn f64_option(&self, key: &str) -> Option<f64> {
        self.options.get(key).and_then(Value::as_f64)
    }

    pub fn bool_option(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(Value::as_bool)
    }

    pub fn object_option(&self, key: &str) -> Option<&Map<String, Value>> {
        self.options.get(key).and_then(Value::as_object)
    }

    pub fn array_option(&self, key: &str) -> Option<&Vec<Value>> {
        self.options.get(key).and_then(Value::as_array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_frame() {
        let text = r#"{
            "name": "playback_overview_changed",
            "type": "broadcast",
            "id": "42",
            "options": { "state": "playing", "volume": 0.5, "track_count": 12 }
        }"#;

        let message = SocketMessage::parse(text).unwrap();
        assert!(message.is("playback_overview_changed"));
        assert!(message.is_broadcast());
        assert_eq!(message.string_option("state"), Some("playing"));
        assert_eq!(message.f64_option("volume"), Some(0.5));
        assert_eq!(message.usize_option("track_count"), Some(12));
        assert_eq!(message.bool_option("muted"), None);
    }

    #[test]
    fn test_parse_rejects_bad_frames() {
        assert!(SocketMessage::parse("not json").is_err());
        assert!(SocketMessage::parse(r#"{"name":"","type":"request","id":"1"}"#).is_err());
        assert!(SocketMessage::parse(r#"{"name":"x","type":"shout","id":"1"}"#).is_err());
    }

    #[test]
    fn test_missing_options_default_to_empty() {
        let message =
            SocketMessage::parse(r#"{"name":"next","type":"request","id":"7"}"#).unwrap();
        assert!(message.options.is_empty());
    }

    #[test]
    fn test_response_keeps_name_and_id() {
        let request = SocketMessage::request("get_current_time");
        let response = request.response_to().with_option("playing_current_time", 12.5);

        assert_eq!(response.name, request.name);
        assert_eq!(response.id, request.id);
        assert_eq!(response.message_type, MessageType::Response);
        assert_eq!(response.f64_option("playing_current_time"), Some(12.5));
    }

    #[test]
    fn test_nested_options() {
        let message = SocketMessage::broadcast("x")
            .with_option("playing_track", json!({ "id": 7, "title": "Song" }))
            .with_option("data", json!([1, 2, 3]));

        assert_eq!(
            message.object_option("playing_track").and_then(|t| t.get("id")),
            Some(&json!(7))
        );
        assert_eq!(message.array_option("data").map(Vec::len), Some(3));
        assert_eq!(message.i64_option("playing_track"), None);
    }
}
