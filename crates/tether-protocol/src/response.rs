//! Invocation responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of an invocation as seen by the developer tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InvocationResponse {
    /// The command ran and produced a value.
    Ok {
        /// Serialized command result.
        result: Value,
    },
    /// The command could not be resolved, bound or executed.
    Error {
        /// Stable error kind (e.g. `NotFound`, `TypeCoercionError`).
        kind: String,
        /// Human-readable detail.
        message: String,
    },
}

impl InvocationResponse {
    /// Create a successful response.
    pub fn ok(result: Value) -> Self {
        Self::Ok { result }
    }

    /// Create an error response.
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error { kind: kind.into(), message: message.into() }
    }

    /// Whether this is a success.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// The error kind, if this is an error.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Ok { .. } => None,
            Self::Error { kind, .. } => Some(kind),
        }
    }
}
