//! Command discovery.
//!
//! Scanning reads a host's operation table and builds a descriptor for every
//! well-formed command operation. Malformed command operations are skipped
//! with a warning; the scan itself never fails.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::host::{CommandHost, CommandMarker, CommandTarget, Input};
use crate::metadata::{CommandDescriptor, HostKey, ParameterDescriptor};

/// Why a command operation was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanIssue {
    /// An input has no parameter marker.
    #[error("input '{input}' at position {position} has no parameter marker")]
    MissingParamMarker {
        /// Native name of the input.
        input: String,
        /// Zero-based input position.
        position: usize,
    },

    /// The command marker has an empty id.
    #[error("command id is empty")]
    EmptyCommandId,

    /// A parameter marker has an empty name.
    #[error("parameter at position {position} has an empty name")]
    EmptyParamName {
        /// Zero-based input position.
        position: usize,
    },

    /// Two parameters share a name.
    #[error("parameter name '{0}' is declared more than once")]
    DuplicateParamName(String),

    /// The operation has no handler to call.
    #[error("no handler is attached")]
    MissingHandler,

    /// An earlier operation on the same host already declared this id.
    #[error("command id '{0}' is already declared by an earlier operation")]
    DuplicateCommandId(String),
}

/// A skipped command operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    /// Name of the host object.
    pub host: String,
    /// Name of the operation.
    pub operation: String,
    /// Declared command id.
    pub command_id: String,
    /// What was wrong.
    pub issue: ScanIssue,
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({}): {}", self.host, self.operation, self.command_id, self.issue)
    }
}

/// Outcome of scanning one host object.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Descriptors of well-formed commands, in declaration order.
    pub descriptors: Vec<CommandDescriptor>,
    /// One warning per skipped command operation.
    pub warnings: Vec<ScanWarning>,
}

impl ScanReport {
    /// Ids of the discovered commands.
    pub fn ids(&self) -> Vec<&str> {
        self.descriptors.iter().map(CommandDescriptor::id).collect()
    }
}

/// Scan a host object for commands.
///
/// Operations without a command marker are ignored. Scanning the same host
/// twice yields equal descriptor sets.
pub fn scan<H: CommandHost>(host: &Arc<H>) -> ScanReport {
    let host_name = host.host_name();
    let key = HostKey::of(host);
    let mut report = ScanReport::default();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for operation in host.operations() {
        let Some(marker) = operation.marker().cloned() else {
            trace!(host = %host_name, operation = %operation.name(), "Skipping unmarked operation");
            continue;
        };
        let operation_name = operation.name().to_string();

        let checked = check(&marker, operation.inputs(), operation.has_handler(), &seen_ids);
        let handler = checked.and_then(|params| {
            operation.into_handler().map(|h| (params, h)).ok_or(ScanIssue::MissingHandler)
        });

        match handler {
            Ok((parameters, handler)) => {
                seen_ids.insert(marker.id.clone());
                report.descriptors.push(CommandDescriptor::new(
                    marker.id,
                    marker.title,
                    marker.description,
                    parameters,
                    marker.response_view_type,
                    key,
                    host_name.clone(),
                    CommandTarget::bind(host, handler),
                ));
            }
            Err(issue) => {
                warn!(
                    host = %host_name,
                    operation = %operation_name,
                    command_id = %marker.id,
                    issue = %issue,
                    "Skipping malformed command"
                );
                report.warnings.push(ScanWarning {
                    host: host_name.clone(),
                    operation: operation_name,
                    command_id: marker.id,
                    issue,
                });
            }
        }
    }

    debug!(
        host = %host_name,
        commands = report.descriptors.len(),
        warnings = report.warnings.len(),
        "Scanned host object"
    );

    report
}

fn check(
    marker: &CommandMarker,
    inputs: &[Input],
    has_handler: bool,
    seen_ids: &HashSet<String>,
) -> Result<Vec<ParameterDescriptor>, ScanIssue> {
    if marker.id.is_empty() {
        return Err(ScanIssue::EmptyCommandId);
    }
    if !has_handler {
        return Err(ScanIssue::MissingHandler);
    }

    let mut parameters: Vec<ParameterDescriptor> = Vec::with_capacity(inputs.len());
    for (position, input) in inputs.iter().enumerate() {
        let param = match input {
            Input::Marked(param) => param,
            Input::Unmarked { name } => {
                return Err(ScanIssue::MissingParamMarker { input: name.clone(), position });
            }
        };
        if param.name.is_empty() {
            return Err(ScanIssue::EmptyParamName { position });
        }
        if parameters.iter().any(|p| p.name == param.name) {
            return Err(ScanIssue::DuplicateParamName(param.name.clone()));
        }
        parameters.push(ParameterDescriptor {
            name: param.name.clone(),
            position,
            declared_type: param.declared_type,
            options: param.options.clone(),
        });
    }

    if seen_ids.contains(&marker.id) {
        return Err(ScanIssue::DuplicateCommandId(marker.id.clone()));
    }

    Ok(parameters)
}
