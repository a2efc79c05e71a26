//! In-memory model of discovered commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::host::CommandTarget;

/// Declared type of a command parameter; drives coercion of raw values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Passed through unchanged.
    String,
    /// Parsed as a signed 64-bit integer.
    Integer,
    /// Parsed as a finite 64-bit float.
    Float,
    /// One of `true`, `false`, `1`, `0` (case-insensitive).
    Boolean,
    /// Passed through unchanged; usually JSON text.
    Raw,
}

impl ParamType {
    /// Get the string representation of the parameter type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(Self::String),
            "integer" | "int" => Ok(Self::Integer),
            "float" | "double" | "number" => Ok(Self::Float),
            "boolean" | "bool" => Ok(Self::Boolean),
            "raw" | "json" => Ok(Self::Raw),
            other => Err(format!("Unknown parameter type: {}", other)),
        }
    }
}

/// A suggested value the tool may offer for a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamOption {
    /// Label shown in the tool.
    pub label: String,
    /// Raw value sent when the option is picked.
    pub value: String,
}

impl ParamOption {
    /// Create a new option.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into() }
    }
}

/// How the tool should render a command's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseViewType {
    /// Let the tool pick a view from the value's shape.
    Auto,
    /// Render sequences of mappings as a table.
    Table,
}

impl ResponseViewType {
    /// Get the string representation of the view type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Table => "table",
        }
    }
}

/// Identity of a host object while it is known to the registry.
///
/// Derived from the address of the host's `Arc` allocation. Descriptors keep
/// a `Weak` to the host, which keeps the allocation (and thus the key)
/// reserved until the last descriptor is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostKey(usize);

impl HostKey {
    /// Key of the given host object.
    pub fn of<H>(host: &Arc<H>) -> Self {
        Self(Arc::as_ptr(host).cast::<()>() as usize)
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host@{:#x}", self.0)
    }
}

/// One parameter of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    /// Name used for name-keyed binding.
    pub name: String,
    /// Zero-based position used for positional binding.
    pub position: usize,
    /// Declared type.
    pub declared_type: ParamType,
    /// Suggested values for the tool.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ParamOption>,
}

/// A discovered command: metadata plus the callable it is bound to.
///
/// Immutable once created. The registry hands descriptors out behind `Arc`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDescriptor {
    id: String,
    title: String,
    description: String,
    parameters: Vec<ParameterDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_view_type: Option<ResponseViewType>,
    #[serde(skip)]
    host: HostKey,
    #[serde(skip)]
    host_name: String,
    #[serde(skip)]
    target: CommandTarget,
}

impl CommandDescriptor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: String,
        title: String,
        description: String,
        parameters: Vec<ParameterDescriptor>,
        response_view_type: Option<ResponseViewType>,
        host: HostKey,
        host_name: String,
        target: CommandTarget,
    ) -> Self {
        let title = if title.is_empty() { id.clone() } else { title };
        Self { id, title, description, parameters, response_view_type, host, host_name, target }
    }

    /// Command identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display title; the id when none was declared.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Display description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameters in call order.
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    /// Rendering hint for the result.
    pub fn response_view_type(&self) -> Option<ResponseViewType> {
        self.response_view_type
    }

    /// Key of the owning host object.
    pub fn host(&self) -> HostKey {
        self.host
    }

    /// Name of the owning host object.
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// The bound callable.
    pub fn target(&self) -> &CommandTarget {
        &self.target
    }

    /// Whether the owning host object is still alive.
    pub fn is_live(&self) -> bool {
        self.target.is_alive()
    }
}

// Implement Debug manually since the bound target is opaque
impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("response_view_type", &self.response_view_type)
            .field("host", &self.host)
            .field("host_name", &self.host_name)
            .field("target", &"<target>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_type_from_str() {
        assert_eq!("Integer".parse::<ParamType>().unwrap(), ParamType::Integer);
        assert_eq!("number".parse::<ParamType>().unwrap(), ParamType::Float);
        assert_eq!("bool".parse::<ParamType>().unwrap(), ParamType::Boolean);
        assert!("date".parse::<ParamType>().is_err());
    }

    #[test]
    fn test_param_type_serde_lowercase() {
        let value = serde_json::to_value(ParamType::Boolean).unwrap();
        assert_eq!(value, serde_json::json!("boolean"));
        let parsed: ParamType = serde_json::from_value(serde_json::json!("raw")).unwrap();
        assert_eq!(parsed, ParamType::Raw);
    }

    #[test]
    fn test_host_key_identity() {
        let a = Arc::new(1_u8);
        let b = Arc::new(1_u8);
        assert_eq!(HostKey::of(&a), HostKey::of(&Arc::clone(&a)));
        assert_ne!(HostKey::of(&a), HostKey::of(&b));
    }

    #[test]
    fn test_parameter_descriptor_serialization() {
        let param = ParameterDescriptor {
            name: "level".to_string(),
            position: 0,
            declared_type: ParamType::String,
            options: vec![ParamOption::new("Verbose", "debug")],
        };
        let value = serde_json::to_value(&param).unwrap();
        assert_eq!(value["declaredType"], "string");
        assert_eq!(value["options"][0]["label"], "Verbose");
    }
}
