//! Error types for the command core.

use crate::metadata::ParamType;
use thiserror::Error;

/// Errors returned by registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Another host object already owns this command id.
    #[error("Command id '{id}' is already registered by {owner}")]
    DuplicateCommandId {
        /// The colliding command id.
        id: String,
        /// Name of the host that currently owns the id.
        owner: String,
    },

    /// No live command with this id is registered.
    #[error("Command not found: {0}")]
    NotFound(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors produced while binding raw arguments to a command's parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The request carried no value for this parameter.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// The raw value could not be converted to the declared type.
    #[error("Cannot coerce '{value}' to {expected} for parameter '{name}'")]
    TypeCoercion {
        /// Parameter name.
        name: String,
        /// Declared parameter type.
        expected: ParamType,
        /// The offending raw value.
        value: String,
    },
}

/// Failures raised by a command handler while it runs.
///
/// The invoker turns every fault into a `RuntimeFault` result; none of them
/// reach the host application.
#[derive(Error, Debug)]
pub enum CommandFault {
    /// Free-form failure.
    #[error("{0}")]
    Message(String),

    /// The host object was not in a state to serve the call.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Overflow, division by zero and similar.
    #[error("Arithmetic fault: {0}")]
    Arithmetic(String),

    /// I/O or other resource failure.
    #[error("Resource fault: {0}")]
    Resource(#[from] std::io::Error),

    /// The handler panicked.
    #[error("Command panicked: {0}")]
    Panic(String),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CommandFault {
    /// Create a free-form fault.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Create an invalid-state fault.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create an arithmetic fault.
    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::Arithmetic(message.into())
    }
}

impl From<String> for CommandFault {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for CommandFault {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

/// Errors loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing error.
    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is not acceptable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
