//! Command invocation.
//!
//! Runs a bound command and turns every way it can end into an
//! [`InvocationResult`]. Handler errors and panics never reach the caller.

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tether_protocol::InvocationResponse;
use tracing::{debug, error};

use crate::binder::BoundArgs;
use crate::error::{BindError, CommandFault};
use crate::host::PreparedCall;
use crate::metadata::CommandDescriptor;

/// Category of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// No live command with the requested id.
    NotFound,
    /// A declared parameter had no value.
    MissingParameter,
    /// A value could not be converted to its declared type.
    TypeCoercionError,
    /// The command failed or panicked while running.
    RuntimeFault,
    /// The command did not finish within the configured limit.
    Timeout,
    /// The request itself could not be read.
    BadRequest,
}

impl FailureKind {
    /// Stable name sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::MissingParameter => "MissingParameter",
            Self::TypeCoercionError => "TypeCoercionError",
            Self::RuntimeFault => "RuntimeFault",
            Self::Timeout => "Timeout",
            Self::BadRequest => "BadRequest",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    /// The command's return value.
    Success(Value),
    /// Why the invocation failed.
    Failure {
        /// Failure category.
        kind: FailureKind,
        /// Human-readable detail.
        message: String,
    },
}

impl InvocationResult {
    /// Create a failure.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure { kind, message: message.into() }
    }

    /// Whether the command ran to completion.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Failure category, if any.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// The return value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure { .. } => None,
        }
    }
}

impl From<BindError> for InvocationResult {
    fn from(err: BindError) -> Self {
        let kind = match err {
            BindError::MissingParameter(_) => FailureKind::MissingParameter,
            BindError::TypeCoercion { .. } => FailureKind::TypeCoercionError,
        };
        Self::failure(kind, err.to_string())
    }
}

impl From<InvocationResult> for InvocationResponse {
    fn from(result: InvocationResult) -> Self {
        match result {
            InvocationResult::Success(value) => Self::ok(value),
            InvocationResult::Failure { kind, message } => Self::error(kind.as_str(), message),
        }
    }
}

/// Invoke a command with already-bound arguments.
pub async fn invoke(descriptor: &CommandDescriptor, args: BoundArgs) -> InvocationResult {
    match descriptor.target().prepare() {
        Some(call) => invoke_prepared(descriptor.id(), call, args).await,
        None => {
            debug!(command_id = %descriptor.id(), "Host dropped before invocation");
            InvocationResult::failure(
                FailureKind::NotFound,
                format!("Command not found: {}", descriptor.id()),
            )
        }
    }
}

/// Run a call whose host was captured at lookup time.
pub async fn invoke_prepared(
    command_id: &str,
    call: PreparedCall,
    args: BoundArgs,
) -> InvocationResult {
    let started = Instant::now();
    debug!(command_id = %command_id, args = args.len(), "Invoking command");

    let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| call.start(args))) {
        Ok(future) => match AssertUnwindSafe(future).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(CommandFault::Panic(panic_message(payload.as_ref()))),
        },
        Err(payload) => Err(CommandFault::Panic(panic_message(payload.as_ref()))),
    };

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match outcome {
        Ok(value) => {
            debug!(command_id = %command_id, elapsed_ms, "Command completed");
            InvocationResult::Success(value)
        }
        Err(fault) => {
            error!(command_id = %command_id, elapsed_ms, error = %fault, "Command failed");
            InvocationResult::failure(FailureKind::RuntimeFault, fault.to_string())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
