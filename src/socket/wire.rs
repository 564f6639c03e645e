//! Wire types for the realtime channel.
//!
//! Every frame on the socket is a JSON text envelope of the form
//! `{"event": <name>, "data": <payload>}`. Outbound events are the closed
//! set in [`ClientEvent`]; inbound events decode into [`ServerEvent`].
//! Frames with an unknown event name or a payload that does not match the
//! event's schema decode to `None` and are dropped by the reader.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Namespace path the client connects to under the socket host.
pub const NAMESPACE: &str = "/homework-assistant";

const EVENT_REQUEST: &str = "homework_assistant:request";
const EVENT_HISTORY_REQUEST: &str = "homework_assistant:history:request";

const EVENT_MESSAGE: &str = "message";
const EVENT_SYSTEM_MESSAGE: &str = "system:message";
const EVENT_RESPONSE: &str = "homework_assistant:response";
const EVENT_TYPING: &str = "homework_assistant:typing";
const EVENT_HISTORY_RESPONSE: &str = "homework_assistant:history:response";

/// Payload classification for an outbound chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Text,
    Image,
    Document,
}

/// Outbound chat request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub curriculum: String,
    pub class_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new_chat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    pub message_type: MessageType,
}

/// Scope of a history request: one conversation group, or the most
/// recent exchanges for a curriculum when no group is selected yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryScope {
    Group(String),
    NewSession(String),
}

/// Events the client emits.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Request(ChatRequest),
    HistoryRequest(HistoryScope),
}

impl ClientEvent {
    /// Wire name of this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientEvent::Request(_) => EVENT_REQUEST,
            ClientEvent::HistoryRequest(_) => EVENT_HISTORY_REQUEST,
        }
    }

    /// Encode into a JSON envelope frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        let data = match self {
            ClientEvent::Request(request) => serde_json::to_value(request)?,
            ClientEvent::HistoryRequest(HistoryScope::Group(group_id)) => {
                serde_json::json!({ "groupId": group_id })
            }
            ClientEvent::HistoryRequest(HistoryScope::NewSession(curriculum)) => {
                serde_json::json!({ "curriculum": curriculum })
            }
        };
        serde_json::to_string(&serde_json::json!({
            "event": self.event_name(),
            "data": data,
        }))
    }
}

/// Body of a successful assistant response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Envelope of an assistant response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponsePayload {
    pub success: bool,
    #[serde(default)]
    pub data: Option<ResponseData>,
}

/// One question/answer pair from the conversation history.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    #[serde(default)]
    pub question: Option<String>,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    /// Per-field timestamps, when the server reports them.
    #[serde(default)]
    pub question_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub answer_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Envelope of a history response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryPayload {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<HistoryItem>>,
}

/// Events the server emits.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Transport-level catch-all; logged, never rendered.
    Message(Value),
    /// Service announcement. The payload is either a bare string or an
    /// object with a `message` field; anything else is dropped at decode.
    System(String),
    Response(ResponsePayload),
    Typing,
    HistoryResponse(HistoryPayload),
}

impl ServerEvent {
    /// Decode a JSON envelope frame. Returns `None` for unknown event
    /// names and for payloads that do not match the event's schema.
    pub fn from_frame(text: &str) -> Option<Self> {
        let envelope: Value = serde_json::from_str(text).ok()?;
        let event = envelope.get("event")?.as_str()?;
        let data = envelope.get("data").cloned().unwrap_or(Value::Null);

        match event {
            EVENT_MESSAGE => Some(ServerEvent::Message(data)),
            EVENT_SYSTEM_MESSAGE => decode_system(data).map(ServerEvent::System),
            EVENT_RESPONSE => serde_json::from_value(data).ok().map(ServerEvent::Response),
            EVENT_TYPING => Some(ServerEvent::Typing),
            EVENT_HISTORY_RESPONSE => serde_json::from_value(data)
                .ok()
                .map(ServerEvent::HistoryResponse),
            _ => None,
        }
    }
}

/// System messages arrive either as `"text"` or as `{"message": "text"}`.
fn decode_system(data: Value) -> Option<String> {
    match data {
        Value::String(text) => Some(text),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(text)) => Some(text.clone()),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_frame_shape() {
        let event = ClientEvent::Request(ChatRequest {
            message: "Explain osmosis".to_string(),
            curriculum: "Biology".to_string(),
            class_level: "SSS 1".to_string(),
            group_id: None,
            is_new_chat: Some(true),
            media_url: None,
            message_type: MessageType::Text,
        });

        let frame: Value = serde_json::from_str(&event.to_frame().unwrap()).unwrap();
        assert_eq!(frame["event"], "homework_assistant:request");
        assert_eq!(frame["data"]["message"], "Explain osmosis");
        assert_eq!(frame["data"]["classLevel"], "SSS 1");
        assert_eq!(frame["data"]["isNewChat"], true);
        assert_eq!(frame["data"]["messageType"], "TEXT");
        // Absent options are omitted, not null.
        assert!(frame["data"].get("groupId").is_none());
        assert!(frame["data"].get("mediaUrl").is_none());
    }

    #[test]
    fn test_history_request_frames() {
        let group = ClientEvent::HistoryRequest(HistoryScope::Group("g-1".to_string()));
        let frame: Value = serde_json::from_str(&group.to_frame().unwrap()).unwrap();
        assert_eq!(frame["event"], "homework_assistant:history:request");
        assert_eq!(frame["data"]["groupId"], "g-1");

        let fresh = ClientEvent::HistoryRequest(HistoryScope::NewSession("Biology".to_string()));
        let frame: Value = serde_json::from_str(&fresh.to_frame().unwrap()).unwrap();
        assert_eq!(frame["data"]["curriculum"], "Biology");
    }

    #[test]
    fn test_system_message_string_payload() {
        let frame = r#"{"event":"system:message","data":"maintenance at noon"}"#;
        assert_eq!(
            ServerEvent::from_frame(frame),
            Some(ServerEvent::System("maintenance at noon".to_string()))
        );
    }

    #[test]
    fn test_system_message_object_payload() {
        let frame = r#"{"event":"system:message","data":{"message":"welcome back"}}"#;
        assert_eq!(
            ServerEvent::from_frame(frame),
            Some(ServerEvent::System("welcome back".to_string()))
        );
    }

    #[test]
    fn test_system_message_other_shapes_dropped() {
        for frame in [
            r#"{"event":"system:message","data":42}"#,
            r#"{"event":"system:message","data":{"note":"x"}}"#,
            r#"{"event":"system:message","data":{"message":7}}"#,
            r#"{"event":"system:message"}"#,
        ] {
            assert_eq!(ServerEvent::from_frame(frame), None, "frame: {frame}");
        }
    }

    #[test]
    fn test_response_decodes_group_id() {
        let frame = r#"{
            "event": "homework_assistant:response",
            "data": {
                "success": true,
                "data": {
                    "message": "F = ma",
                    "type": "TEXT",
                    "timestamp": "2024-03-01T10:00:00Z",
                    "groupId": "g-42"
                }
            }
        }"#;
        let Some(ServerEvent::Response(payload)) = ServerEvent::from_frame(frame) else {
            panic!("expected response event");
        };
        assert!(payload.success);
        let data = payload.data.unwrap();
        assert_eq!(data.message, "F = ma");
        assert_eq!(data.group_id.as_deref(), Some("g-42"));
    }

    #[test]
    fn test_typing_has_no_payload() {
        let frame = r#"{"event":"homework_assistant:typing"}"#;
        assert_eq!(ServerEvent::from_frame(frame), Some(ServerEvent::Typing));
    }

    #[test]
    fn test_history_response_decodes_items() {
        let frame = r#"{
            "event": "homework_assistant:history:response",
            "data": {
                "success": true,
                "data": [
                    {"question": "What is a cell?", "answer": "The basic unit of life.",
                     "createdAt": "2024-02-01T09:00:00Z"},
                    {"answer": "Mitochondria.", "createdAt": "2024-02-01T09:05:00Z"}
                ]
            }
        }"#;
        let Some(ServerEvent::HistoryResponse(payload)) = ServerEvent::from_frame(frame) else {
            panic!("expected history event");
        };
        let items = payload.data.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].question.as_deref(), Some("What is a cell?"));
        assert!(items[1].question.is_none());
    }

    #[test]
    fn test_unknown_event_dropped() {
        assert_eq!(
            ServerEvent::from_frame(r#"{"event":"homework_assistant:unknown","data":{}}"#),
            None
        );
        assert_eq!(ServerEvent::from_frame("not json at all"), None);
        assert_eq!(ServerEvent::from_frame(r#"{"data":{}}"#), None);
    }
}
