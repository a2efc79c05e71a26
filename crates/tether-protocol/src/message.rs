//! Bridge envelopes.
//!
//! Every value crossing the bridge is wrapped in a [`BridgeMessage`] whose
//! `type` selects how `payload` is read.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{CommandResponsePayload, CommandSummary, RegisterNotice, UnregisterNotice};
use crate::response::InvocationResponse;

/// Message type names.
pub mod message_type {
    /// Inbound: invoke a command.
    pub const CUSTOM: &str = "custom";
    /// Inbound: ask for the command list. Outbound: the command list.
    pub const LIST: &str = "customCommand.list";
    /// Outbound: a command became available.
    pub const REGISTER: &str = "customCommand.register";
    /// Outbound: a command went away.
    pub const UNREGISTER: &str = "customCommand.unregister";
    /// Outbound: result of a `custom` request.
    pub const RESPONSE: &str = "customCommand.response";
}

/// Envelope for every message on the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeMessage {
    /// Message type, see [`message_type`].
    #[serde(rename = "type")]
    pub message_type: String,
    /// Type-specific payload.
    #[serde(default)]
    pub payload: Value,
    /// RFC 3339 timestamp set by the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Milliseconds since the sender's previous message. Set by the
    /// transport when the message is written.
    #[serde(default)]
    pub delta_time: u64,
    /// Whether the tool should highlight the message.
    #[serde(default)]
    pub important: bool,
}

impl BridgeMessage {
    /// Create a message stamped with the current time.
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
            date: Some(Utc::now().to_rfc3339()),
            delta_time: 0,
            important: false,
        }
    }

    /// Create a message from any serializable payload.
    pub fn with_payload<T: Serialize>(
        message_type: impl Into<String>,
        payload: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(message_type, serde_json::to_value(payload)?))
    }

    /// `customCommand.register` for one command.
    pub fn register(notice: &RegisterNotice) -> serde_json::Result<Self> {
        Self::with_payload(message_type::REGISTER, notice)
    }

    /// `customCommand.unregister` for one command.
    pub fn unregister(notice: &UnregisterNotice) -> serde_json::Result<Self> {
        Self::with_payload(message_type::UNREGISTER, notice)
    }

    /// `customCommand.list` carrying every command.
    pub fn listing(summaries: &[CommandSummary]) -> serde_json::Result<Self> {
        Self::with_payload(message_type::LIST, &summaries)
    }

    /// `customCommand.response` for a finished invocation.
    pub fn response(
        command: impl Into<String>,
        response: InvocationResponse,
    ) -> serde_json::Result<Self> {
        let important = !response.is_ok();
        let mut message = Self::with_payload(
            message_type::RESPONSE,
            &CommandResponsePayload { command: command.into(), payload: response },
        )?;
        message.important = important;
        Ok(message)
    }

    /// Whether this message has the given type.
    pub fn is(&self, message_type: &str) -> bool {
        self.message_type == message_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandArg;
    use serde_json::json;

    #[test]
    fn test_inbound_message_defaults() {
        let message: BridgeMessage =
            serde_json::from_value(json!({"type": "custom", "payload": "getInfo"})).unwrap();
        assert!(message.is(message_type::CUSTOM));
        assert_eq!(message.payload, json!("getInfo"));
        assert_eq!(message.date, None);
        assert_eq!(message.delta_time, 0);
        assert!(!message.important);
    }

    #[test]
    fn test_register_message_shape() {
        let notice = RegisterNotice {
            id: 3,
            command: "multiply".to_string(),
            title: Some("Multiply".to_string()),
            description: None,
            args: vec![CommandArg {
                name: "x".to_string(),
                arg_type: "integer".to_string(),
                options: Vec::new(),
            }],
            response_view_type: None,
        };
        let message = BridgeMessage::register(&notice).unwrap();
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "customCommand.register");
        assert_eq!(value["payload"]["id"], 3);
        assert_eq!(value["payload"]["command"], "multiply");
        assert_eq!(value["payload"]["args"][0]["type"], "integer");
        assert!(value["payload"]["args"][0].get("options").is_none());
        assert!(value["payload"].get("description").is_none());
        assert!(value["payload"].get("responseViewType").is_none());
        assert!(value["date"].is_string());
        assert_eq!(value["deltaTime"], 0);
    }

    #[test]
    fn test_unregister_message_shape() {
        let notice = UnregisterNotice { id: 3, command: "multiply".to_string() };
        let value = serde_json::to_value(BridgeMessage::unregister(&notice).unwrap()).unwrap();
        assert_eq!(value["payload"], json!({"id": 3, "command": "multiply"}));
    }

    #[test]
    fn test_error_response_is_important() {
        let message = BridgeMessage::response(
            "multiply",
            InvocationResponse::error("TypeCoercionError", "bad"),
        )
        .unwrap();
        assert!(message.important);
        assert_eq!(message.payload["command"], "multiply");
        assert_eq!(message.payload["payload"]["status"], "error");
    }
}
