//! Protocol messages and their send envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One piece of message content. Only text parts exist today.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Part {
    Text { text: String },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Part::Text { text } => text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Message {
    pub fn builder(role: Role) -> MessageBuilder {
        MessageBuilder {
            message: Message {
                role,
                message_id: Uuid::new_v4().to_string(),
                context_id: None,
                task_id: None,
                parts: Vec::new(),
                metadata: BTreeMap::new(),
            },
        }
    }

    /// Text of the first part, or empty. Inbound skill input is read
    /// this way.
    pub fn first_text(&self) -> &str {
        self.parts.first().map(Part::as_text).unwrap_or("")
    }
}

pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message.message_id = id.into();
        self
    }

    pub fn context_id(mut self, id: impl Into<String>) -> Self {
        self.message.context_id = Some(id.into());
        self
    }

    pub fn task_id(mut self, id: impl Into<String>) -> Self {
        self.message.task_id = Some(id.into());
        self
    }

    pub fn part(mut self, part: Part) -> Self {
        self.message.parts.push(part);
        self
    }

    pub fn parts(mut self, parts: Vec<Part>) -> Self {
        self.message.parts = parts;
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.message.metadata.insert(key.into(), value);
        self
    }

    pub fn build(self) -> Message {
        self.message
    }
}

/// Payload of a send-message call.
///
/// The message is optional on the wire; the task manager rejects
/// payloads without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<MessageSendConfiguration>,
}

impl MessageSendParams {
    pub fn new(message: Message) -> Self {
        Self {
            message: Some(message),
            configuration: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepted_output_modes: Vec<String>,
    #[serde(default)]
    pub blocking: bool,
}

/// JSON-RPC style request envelope for a remote send-message call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub id: String,
    pub params: MessageSendParams,
}

impl SendMessageRequest {
    pub fn new(params: MessageSendParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            params,
        }
    }
}

/// Response envelope: a result message or a terminal error, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_assigns_a_message_id() {
        let msg = Message::builder(Role::User)
            .context_id("ctx")
            .part(Part::text("hello"))
            .build();
        assert!(!msg.message_id.is_empty());
        assert_eq!(msg.first_text(), "hello");
    }

    #[test]
    fn first_text_of_empty_message_is_empty() {
        let msg = Message::builder(Role::Agent).build();
        assert_eq!(msg.first_text(), "");
    }

    #[test]
    fn params_round_trip_camel_case() {
        let msg = Message::builder(Role::User)
            .task_id("t-1")
            .part(Part::text("in"))
            .metadata("skillId", json!("s-1"))
            .build();
        let value = serde_json::to_value(MessageSendParams::new(msg)).unwrap();
        assert_eq!(value["message"]["taskId"], json!("t-1"));
        assert_eq!(value["message"]["metadata"]["skillId"], json!("s-1"));

        let back: MessageSendParams = serde_json::from_value(value).unwrap();
        assert_eq!(back.message.unwrap().task_id.as_deref(), Some("t-1"));
    }
}
