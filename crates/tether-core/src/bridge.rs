//! Facade used by the bridge transport.
//!
//! [`CommandBridge`] lists commands, dispatches invocation requests and
//! turns registry changes into outbound bridge messages. It is the only
//! place that converts between core types and wire types.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tether_protocol::{
    BridgeMessage, CommandArg, CommandSummary, InvocationRequest, InvocationResponse,
    OptionSummary, ParameterSummary, RawArgs, RegisterNotice, UnregisterNotice, message_type,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::binder::bind;
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::host::CommandHost;
use crate::invoker::{FailureKind, InvocationResult, invoke_prepared};
use crate::registry::{CommandRegistry, RegisteredCommand, RegistryEvent};
use crate::scanner::ScanWarning;

/// Lifecycle change reported by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleChange {
    /// The host object came into existence.
    Added,
    /// The host object is going away.
    Removed,
}

/// Entry point for the developer-tool side of the bridge.
#[derive(Debug, Clone)]
pub struct CommandBridge {
    registry: Arc<CommandRegistry>,
    invoke_timeout: Option<Duration>,
}

impl CommandBridge {
    /// Create a bridge over a registry; invocations are unbounded.
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry, invoke_timeout: None }
    }

    /// Create a bridge with settings.
    pub fn with_config(registry: Arc<CommandRegistry>, config: &BridgeConfig) -> Self {
        Self { registry, invoke_timeout: config.invoke_timeout() }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Summaries of all live commands, ordered by handle.
    pub async fn list_commands(&self) -> Vec<CommandSummary> {
        self.registry.entries().await.iter().map(summarize).collect()
    }

    /// Look up, bind and run a command.
    pub async fn invoke_command(&self, id: &str, raw_args: &RawArgs) -> InvocationResult {
        let descriptor = match self.registry.lookup(id).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                debug!(command_id = %id, "Invocation of unknown command");
                return InvocationResult::failure(FailureKind::NotFound, err.to_string());
            }
        };

        // Hold the host from here on so a concurrent unregister cannot strand the call.
        let Some(call) = descriptor.target().prepare() else {
            return InvocationResult::failure(
                FailureKind::NotFound,
                format!("Command not found: {}", id),
            );
        };

        let args = match bind(&descriptor, raw_args) {
            Ok(args) => args,
            Err(err) => return err.into(),
        };

        match self.invoke_timeout {
            Some(limit) => {
                let run = invoke_prepared(id, call, args);
                if let Ok(result) = tokio::time::timeout(limit, run).await {
                    result
                } else {
                    warn!(command_id = %id, timeout_ms = %limit.as_millis(), "Command timed out");
                    InvocationResult::failure(
                        FailureKind::Timeout,
                        format!("Command '{}' did not finish within {} ms", id, limit.as_millis()),
                    )
                }
            }
            None => invoke_prepared(id, call, args).await,
        }
    }

    /// Serve a parsed invocation request.
    pub async fn handle_request(&self, request: &InvocationRequest) -> InvocationResponse {
        self.invoke_command(&request.command_id, &request.args).await.into()
    }

    /// Serve an invocation request given as JSON text.
    pub async fn handle_json(&self, text: &str) -> InvocationResponse {
        match serde_json::from_str::<Value>(text).and_then(InvocationRequest::from_payload) {
            Ok(request) => self.handle_request(&request).await,
            Err(err) => {
                debug!(error = %err, "Malformed invocation request");
                InvocationResponse::error(
                    FailureKind::BadRequest.as_str(),
                    format!("Malformed request: {}", err),
                )
            }
        }
    }

    /// Answer an inbound bridge message.
    ///
    /// `custom` gets a `customCommand.response`, `customCommand.list` gets
    /// the command list. Other message types are ignored.
    ///
    /// # Errors
    /// Returns an error only if the reply cannot be serialized.
    pub async fn handle_message(
        &self,
        message: &BridgeMessage,
    ) -> serde_json::Result<Option<BridgeMessage>> {
        if message.is(message_type::CUSTOM) {
            return match InvocationRequest::from_payload(message.payload.clone()) {
                Ok(request) => {
                    let response = self.handle_request(&request).await;
                    BridgeMessage::response(request.command_id, response).map(Some)
                }
                Err(err) => {
                    debug!(error = %err, "Malformed custom payload");
                    let command = command_name(&message.payload);
                    let response = InvocationResponse::error(
                        FailureKind::BadRequest.as_str(),
                        format!("Malformed request: {}", err),
                    );
                    BridgeMessage::response(command, response).map(Some)
                }
            };
        }

        if message.is(message_type::LIST) {
            let summaries = self.list_commands().await;
            return BridgeMessage::listing(&summaries).map(Some);
        }

        debug!(message_type = %message.message_type, "Ignoring message");
        Ok(None)
    }

    /// Keep the registry in step with a host object's lifecycle.
    ///
    /// # Errors
    /// Returns the registry's error when `Added` collides with another host.
    pub async fn on_host_lifecycle_change<H: CommandHost>(
        &self,
        host: &Arc<H>,
        change: LifecycleChange,
    ) -> Result<Vec<ScanWarning>> {
        match change {
            LifecycleChange::Added => self.registry.register(host).await,
            LifecycleChange::Removed => {
                self.registry.unregister(host).await;
                Ok(Vec::new())
            }
        }
    }

    /// Subscribe to registry changes; map them with [`notice_for`].
    pub fn notices(&self) -> broadcast::Receiver<RegistryEvent> {
        self.registry.subscribe()
    }
}

/// Wire summary of a registered command.
pub fn summarize(command: &RegisteredCommand) -> CommandSummary {
    let descriptor = &command.descriptor;
    CommandSummary {
        id: descriptor.id().to_string(),
        handle: command.handle,
        title: descriptor.title().to_string(),
        description: descriptor.description().to_string(),
        parameters: descriptor
            .parameters()
            .iter()
            .map(|p| ParameterSummary {
                name: p.name.clone(),
                position: p.position,
                param_type: p.declared_type.as_str().to_string(),
                options: p
                    .options
                    .iter()
                    .map(|o| OptionSummary { label: o.label.clone(), value: o.value.clone() })
                    .collect(),
            })
            .collect(),
        response_view_type: descriptor.response_view_type().map(|v| v.as_str().to_string()),
    }
}

/// Outbound message announcing a registry change.
///
/// # Errors
/// Returns an error only if the payload cannot be serialized.
pub fn notice_for(event: &RegistryEvent) -> serde_json::Result<BridgeMessage> {
    match event {
        RegistryEvent::Registered(command) => BridgeMessage::register(&register_notice(command)),
        RegistryEvent::Unregistered { id, handle } => {
            BridgeMessage::unregister(&UnregisterNotice { id: *handle, command: id.clone() })
        }
    }
}

fn register_notice(command: &RegisteredCommand) -> RegisterNotice {
    let descriptor = &command.descriptor;
    let description = descriptor.description();
    RegisterNotice {
        id: command.handle,
        command: descriptor.id().to_string(),
        title: Some(descriptor.title().to_string()),
        description: (!description.is_empty()).then(|| description.to_string()),
        args: descriptor
            .parameters()
            .iter()
            .map(|p| CommandArg {
                name: p.name.clone(),
                arg_type: p.declared_type.as_str().to_string(),
                options: p
                    .options
                    .iter()
                    .map(|o| OptionSummary { label: o.label.clone(), value: o.value.clone() })
                    .collect(),
            })
            .collect(),
        response_view_type: descriptor.response_view_type().map(|v| v.as_str().to_string()),
    }
}

fn command_name(payload: &Value) -> String {
    payload
        .get("commandId")
        .or_else(|| payload.get("command"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
