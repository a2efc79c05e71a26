//! Command announcement payloads.

use serde::{Deserialize, Serialize};

use crate::response::InvocationResponse;

/// A registered command as listed to the developer tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSummary {
    /// Command identifier used in invocation requests.
    pub id: String,
    /// Registry-assigned number, increasing in registration order.
    pub handle: u64,
    /// Display title.
    pub title: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Parameters in call order.
    #[serde(default)]
    pub parameters: Vec<ParameterSummary>,
    /// Rendering hint for the result (`auto`, `table`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_view_type: Option<String>,
}

/// A parameter as listed to the developer tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSummary {
    /// Name used for name-keyed binding.
    pub name: String,
    /// Zero-based position used for positional binding.
    pub position: usize,
    /// Declared type (`string`, `integer`, `float`, `boolean`, `raw`).
    #[serde(rename = "type")]
    pub param_type: String,
    /// Suggested values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSummary>,
}

/// One suggested value for a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSummary {
    /// Label shown in the tool.
    pub label: String,
    /// Raw value sent back when chosen.
    pub value: String,
}

/// Payload of a `customCommand.register` message.
///
/// The developer tool groups notices by `command` and builds its input
/// form from `args`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNotice {
    /// Registry handle of the command.
    pub id: u64,
    /// Command identifier used in invocation requests.
    pub command: String,
    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Arguments in call order.
    #[serde(default)]
    pub args: Vec<CommandArg>,
    /// Rendering hint for the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_view_type: Option<String>,
}

/// One argument of a [`RegisterNotice`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArg {
    /// Argument name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub arg_type: String,
    /// Suggested values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionSummary>,
}

/// Payload of a `customCommand.unregister` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisterNotice {
    /// Registry handle the command had.
    pub id: u64,
    /// Identifier of the removed command.
    pub command: String,
}

/// Payload of a `customCommand.response` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponsePayload {
    /// Identifier of the command that ran.
    pub command: String,
    /// The invocation outcome.
    pub payload: InvocationResponse,
}
