//! # Tether core
//!
//! Lets an application expose debug commands to an external developer tool.
//!
//! Host objects declare commands through [`CommandHost`]. The
//! [`CommandRegistry`] scans and indexes them, the binder coerces the tool's
//! string arguments to declared types, and the invoker runs the command with
//! faults contained. [`CommandBridge`] ties these together for a transport.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tether_core::{CommandBridge, CommandRegistry, LifecycleChange};
//! # use tether_core::{CommandHost, Operation};
//! # struct Settings;
//! # impl CommandHost for Settings {
//! #     fn operations(&self) -> Vec<Operation<Self>> { Vec::new() }
//! # }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bridge = CommandBridge::new(Arc::new(CommandRegistry::new()));
//! let settings = Arc::new(Settings);
//! bridge.on_host_lifecycle_change(&settings, LifecycleChange::Added).await?;
//!
//! let response = bridge.handle_json(r#"{"commandId": "getInfo"}"#).await;
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod invoker;
pub mod metadata;
pub mod registry;
pub mod scanner;

pub use binder::{ArgValue, BoundArgs, bind, coerce};
pub use bridge::{CommandBridge, LifecycleChange, notice_for, summarize};
pub use config::{BridgeConfig, DuplicatePolicy, RegistryConfig, TetherConfig};
pub use error::{BindError, CommandFault, ConfigError, RegistryError, Result};
pub use host::{
    CommandHost, CommandMarker, CommandTarget, Input, Operation, ParamMarker, PreparedCall,
};
pub use invoker::{FailureKind, InvocationResult, invoke, invoke_prepared};
pub use metadata::{
    CommandDescriptor, HostKey, ParamOption, ParamType, ParameterDescriptor, ResponseViewType,
};
pub use registry::{CommandRegistry, RegisteredCommand, RegistryEvent};
pub use scanner::{ScanIssue, ScanReport, ScanWarning, scan};
