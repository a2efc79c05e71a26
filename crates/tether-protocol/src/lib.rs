//! Wire protocol for Tether.
//!
//! The developer tool and the running application exchange JSON values:
//! - invocation requests (`{"commandId", "args"}`)
//! - invocation responses (`{"status": "ok" | "error", ...}`)
//! - bridge envelopes (`{"type", "payload", "date", ...}`) carrying command
//!   announcements and responses
//!
//! The transport that moves these values is not part of this crate.

pub mod command;
pub mod message;
pub mod request;
pub mod response;

pub use command::{
    CommandArg, CommandResponsePayload, CommandSummary, OptionSummary, ParameterSummary,
    RegisterNotice, UnregisterNotice,
};
pub use message::{BridgeMessage, message_type};
pub use request::{InvocationRequest, RawArgs};
pub use response::InvocationResponse;
