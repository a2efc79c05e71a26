//! Inbound invocation requests.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw, string-encoded arguments for a command invocation.
///
/// The tool either names every value (`{"x": "6"}`) or lists them in
/// parameter order (`["6", "7"]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawArgs {
    /// Values keyed by parameter name.
    Named(BTreeMap<String, String>),
    /// Values in parameter order.
    Positional(Vec<String>),
}

impl Default for RawArgs {
    fn default() -> Self {
        Self::Named(BTreeMap::new())
    }
}

impl RawArgs {
    /// Build name-keyed arguments.
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Named(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Build positional arguments.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Number of raw values carried.
    pub fn len(&self) -> usize {
        match self {
            Self::Named(map) => map.len(),
            Self::Positional(values) => values.len(),
        }
    }

    /// Whether no values are carried.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TryFrom<Value> for RawArgs {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::default()),
            // A null named value counts as absent.
            Value::Object(map) => Ok(Self::Named(
                map.into_iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k, stringify(v)))
                    .collect(),
            )),
            Value::Array(items) => Ok(Self::Positional(items.into_iter().map(stringify).collect())),
            other => Err(format!("args must be an object or an array, got {}", json_kind(&other))),
        }
    }
}

impl<'de> Deserialize<'de> for RawArgs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(de::Error::custom)
    }
}

impl Serialize for RawArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Named(map) => map.serialize(serializer),
            Self::Positional(values) => values.serialize(serializer),
        }
    }
}

/// Scalars become their textual form; nested values keep their JSON text.
fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A request to invoke one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    /// Identifier of the command to run.
    #[serde(alias = "command")]
    pub command_id: String,
    /// Raw argument values.
    #[serde(default)]
    pub args: RawArgs,
}

impl InvocationRequest {
    /// Create a new request.
    pub fn new(command_id: impl Into<String>, args: RawArgs) -> Self {
        Self { command_id: command_id.into(), args }
    }

    /// Parse the payload of a `custom` bridge message.
    ///
    /// Besides the request object, a bare string names a command that takes
    /// no arguments.
    pub fn from_payload(payload: Value) -> serde_json::Result<Self> {
        match payload {
            Value::String(command_id) => Ok(Self::new(command_id, RawArgs::default())),
            other => serde_json::from_value(other),
        }
    }
}
