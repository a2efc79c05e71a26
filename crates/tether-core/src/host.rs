//! Declarations through which host objects expose commands.
//!
//! A host object implements [`CommandHost`] and returns a table of
//! [`Operation`]s. An operation becomes a command when it carries a
//! [`CommandMarker`]; each of its inputs must then carry a [`ParamMarker`].
//!
//! ```rust
//! use tether_core::{BoundArgs, CommandFault, CommandHost, CommandMarker, Operation, ParamMarker};
//!
//! struct MathCommands;
//!
//! impl CommandHost for MathCommands {
//!     fn operations(&self) -> Vec<Operation<Self>> {
//!         vec![Operation::new("multiply")
//!             .command(CommandMarker::new("multiply").title("Multiply Numbers"))
//!             .param(ParamMarker::integer("x"))
//!             .param(ParamMarker::integer("y"))
//!             .handler(|_host: &Self, args: &BoundArgs| {
//!                 let x = args.integer("x")?;
//!                 let y = args.integer("y")?;
//!                 Ok::<_, CommandFault>(x * y)
//!             })]
//!     }
//! }
//! ```

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use crate::binder::BoundArgs;
use crate::error::CommandFault;
use crate::metadata::{ParamOption, ParamType, ResponseViewType};

/// Future returned by a bound command.
pub type HandlerFuture = BoxFuture<'static, Result<Value, CommandFault>>;

type Handler<H> = Arc<dyn Fn(Arc<H>, BoundArgs) -> HandlerFuture + Send + Sync>;

/// An application object whose operations may be registered as commands.
pub trait CommandHost: Send + Sync + Sized + 'static {
    /// Name used in scan warnings, errors and logs.
    fn host_name(&self) -> String {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full).to_string()
    }

    /// The operations this host exposes, in declaration order.
    fn operations(&self) -> Vec<Operation<Self>>;
}

/// Marks an operation as a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMarker {
    /// Command identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Display description.
    pub description: String,
    /// Rendering hint for the result.
    pub response_view_type: Option<ResponseViewType>,
}

impl CommandMarker {
    /// Create a marker with the given command id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            response_view_type: None,
        }
    }

    /// Set the display title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the display description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the rendering hint.
    #[must_use]
    pub fn response_view_type(mut self, view: ResponseViewType) -> Self {
        self.response_view_type = Some(view);
        self
    }
}

/// Marks an operation input as a command parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMarker {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub declared_type: ParamType,
    /// Suggested values.
    pub options: Vec<ParamOption>,
}

impl ParamMarker {
    /// Create a marker with an explicit type.
    pub fn new(name: impl Into<String>, declared_type: ParamType) -> Self {
        Self { name: name.into(), declared_type, options: Vec::new() }
    }

    /// A `String` parameter.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String)
    }

    /// An `Integer` parameter.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Integer)
    }

    /// A `Float` parameter.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Float)
    }

    /// A `Boolean` parameter.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Boolean)
    }

    /// A `Raw` parameter.
    pub fn raw(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Raw)
    }

    /// Add a suggested value.
    #[must_use]
    pub fn option(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(ParamOption::new(label, value));
        self
    }
}

/// One declared input of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Input carrying a parameter marker.
    Marked(ParamMarker),
    /// Input without a marker; makes a command operation malformed.
    Unmarked {
        /// Native name of the input.
        name: String,
    },
}

/// An operation exposed by a host object.
pub struct Operation<H> {
    name: String,
    marker: Option<CommandMarker>,
    inputs: Vec<Input>,
    handler: Option<Handler<H>>,
}

impl<H: Send + Sync + 'static> Operation<H> {
    /// Create an operation with no marker, inputs or handler.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), marker: None, inputs: Vec::new(), handler: None }
    }

    /// Mark the operation as a command.
    #[must_use]
    pub fn command(mut self, marker: CommandMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Append a marked input.
    #[must_use]
    pub fn param(mut self, marker: ParamMarker) -> Self {
        self.inputs.push(Input::Marked(marker));
        self
    }

    /// Append an input that carries no parameter marker.
    #[must_use]
    pub fn unmarked_input(mut self, name: impl Into<String>) -> Self {
        self.inputs.push(Input::Unmarked { name: name.into() });
        self
    }

    /// Attach a synchronous handler.
    #[must_use]
    pub fn handler<F, T, E>(mut self, f: F) -> Self
    where
        F: Fn(&H, &BoundArgs) -> Result<T, E> + Send + Sync + 'static,
        T: Serialize + 'static,
        E: Into<CommandFault> + 'static,
    {
        let f = Arc::new(f);
        let handler: Handler<H> = Arc::new(move |host: Arc<H>, args: BoundArgs| -> HandlerFuture {
            let f = Arc::clone(&f);
            Box::pin(async move { encode((*f)(host.as_ref(), &args)) })
        });
        self.handler = Some(handler);
        self
    }

    /// Attach an asynchronous handler.
    #[must_use]
    pub fn async_handler<F, Fut, T, E>(mut self, f: F) -> Self
    where
        F: Fn(Arc<H>, BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Into<CommandFault> + Send + 'static,
    {
        let handler: Handler<H> = Arc::new(move |host: Arc<H>, args: BoundArgs| -> HandlerFuture {
            let fut = f(host, args);
            Box::pin(async move { encode(fut.await) })
        });
        self.handler = Some(handler);
        self
    }

    /// Operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command marker, if any.
    pub fn marker(&self) -> Option<&CommandMarker> {
        self.marker.as_ref()
    }

    /// Declared inputs.
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Whether a handler is attached.
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub(crate) fn into_handler(self) -> Option<Handler<H>> {
        self.handler
    }
}

impl<H> fmt::Debug for Operation<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("marker", &self.marker)
            .field("inputs", &self.inputs)
            .field("handler", &self.handler.as_ref().map(|_| "<handler>"))
            .finish()
    }
}

fn encode<T: Serialize, E: Into<CommandFault>>(
    outcome: Result<T, E>,
) -> Result<Value, CommandFault> {
    let value = outcome.map_err(Into::into)?;
    serde_json::to_value(value)
        .map_err(|e| CommandFault::message(format!("Result could not be serialized: {}", e)))
}

/// A call ready to run: the host is held strongly until it completes.
pub struct PreparedCall {
    call: Box<dyn FnOnce(BoundArgs) -> HandlerFuture + Send>,
}

impl PreparedCall {
    /// Start the call.
    pub(crate) fn start(self, args: BoundArgs) -> HandlerFuture {
        (self.call)(args)
    }
}

impl fmt::Debug for PreparedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedCall").finish_non_exhaustive()
    }
}

trait ErasedTarget: Send + Sync {
    fn prepare(&self) -> Option<PreparedCall>;
    fn is_alive(&self) -> bool;
}

struct WeakTarget<H> {
    host: Weak<H>,
    handler: Handler<H>,
}

impl<H: Send + Sync + 'static> ErasedTarget for WeakTarget<H> {
    fn prepare(&self) -> Option<PreparedCall> {
        let host = self.host.upgrade()?;
        let handler = Arc::clone(&self.handler);
        Some(PreparedCall { call: Box::new(move |args: BoundArgs| handler(host, args)) })
    }

    fn is_alive(&self) -> bool {
        self.host.strong_count() > 0
    }
}

/// Opaque callable bound to one operation of one host object.
///
/// Holds the host weakly; the registry never keeps a host alive.
#[derive(Clone)]
pub struct CommandTarget(Arc<dyn ErasedTarget>);

impl CommandTarget {
    pub(crate) fn bind<H: Send + Sync + 'static>(host: &Arc<H>, handler: Handler<H>) -> Self {
        Self(Arc::new(WeakTarget { host: Arc::downgrade(host), handler }))
    }

    /// Capture the host strongly for one call; `None` once the host is gone.
    pub fn prepare(&self) -> Option<PreparedCall> {
        self.0.prepare()
    }

    /// Whether the host object is still alive.
    pub fn is_alive(&self) -> bool {
        self.0.is_alive()
    }
}

impl fmt::Debug for CommandTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTarget").field("alive", &self.is_alive()).finish()
    }
}
