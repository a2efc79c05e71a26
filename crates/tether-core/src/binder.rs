//! Argument binding.
//!
//! Turns the raw, string-encoded values of an invocation request into typed
//! values matching a command's declared parameters.
//!
//! All parameters are attempted; the first failure in parameter order is
//! reported so error messages stay reproducible for identical requests.

use serde::Serialize;
use serde_json::{Map, Value};
use tether_protocol::RawArgs;
use tracing::debug;

use crate::error::{BindError, CommandFault};
use crate::metadata::{CommandDescriptor, ParamType, ParameterDescriptor};

/// A coerced argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// A `String` parameter value.
    String(String),
    /// An `Integer` parameter value.
    Integer(i64),
    /// A `Float` parameter value.
    Float(f64),
    /// A `Boolean` parameter value.
    Boolean(bool),
    /// A `Raw` parameter value.
    Raw(String),
}

impl ArgValue {
    /// The parameter type this value was coerced to.
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::String(_) => ParamType::String,
            Self::Integer(_) => ParamType::Integer,
            Self::Float(_) => ParamType::Float,
            Self::Boolean(_) => ParamType::Boolean,
            Self::Raw(_) => ParamType::Raw,
        }
    }

    /// Text of a `String` or `Raw` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Raw(s) => Some(s),
            _ => None,
        }
    }

    /// Value of an `Integer`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Value of a `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Value of a `Boolean`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// JSON form of the value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) | Self::Raw(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Float(n) => Value::from(*n),
            Self::Boolean(b) => Value::Bool(*b),
        }
    }
}

/// Typed arguments in parameter order, as handed to a command handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: Vec<(String, ArgValue)>,
}

impl BoundArgs {
    /// Build arguments from `(name, value)` pairs in parameter order.
    pub fn from_values(values: Vec<(String, ArgValue)>) -> Self {
        Self { values }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument by parameter name.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Argument by parameter position.
    pub fn at(&self, position: usize) -> Option<&ArgValue> {
        self.values.get(position).map(|(_, v)| v)
    }

    /// Iterate `(name, value)` pairs in parameter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    fn require(&self, name: &str) -> Result<&ArgValue, CommandFault> {
        self.get(name)
            .ok_or_else(|| CommandFault::invalid_state(format!("no argument named '{}'", name)))
    }

    fn mismatch(name: &str, wanted: ParamType, got: &ArgValue) -> CommandFault {
        CommandFault::invalid_state(format!(
            "argument '{}' is {}, not {}",
            name,
            got.param_type(),
            wanted
        ))
    }

    /// Text of a `String` or `Raw` argument.
    pub fn string(&self, name: &str) -> Result<&str, CommandFault> {
        let value = self.require(name)?;
        value.as_str().ok_or_else(|| Self::mismatch(name, ParamType::String, value))
    }

    /// Value of an `Integer` argument.
    pub fn integer(&self, name: &str) -> Result<i64, CommandFault> {
        let value = self.require(name)?;
        value.as_i64().ok_or_else(|| Self::mismatch(name, ParamType::Integer, value))
    }

    /// Value of a `Float` argument.
    pub fn float(&self, name: &str) -> Result<f64, CommandFault> {
        let value = self.require(name)?;
        value.as_f64().ok_or_else(|| Self::mismatch(name, ParamType::Float, value))
    }

    /// Value of a `Boolean` argument.
    pub fn boolean(&self, name: &str) -> Result<bool, CommandFault> {
        let value = self.require(name)?;
        value.as_bool().ok_or_else(|| Self::mismatch(name, ParamType::Boolean, value))
    }

    /// Arguments as a JSON object keyed by parameter name.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> =
            self.values.iter().map(|(n, v)| (n.clone(), v.to_json())).collect();
        Value::Object(map)
    }
}

/// Coerce one raw value to a parameter's declared type.
pub fn coerce(param: &ParameterDescriptor, raw: &str) -> Result<ArgValue, BindError> {
    let failed = || BindError::TypeCoercion {
        name: param.name.clone(),
        expected: param.declared_type,
        value: raw.to_string(),
    };

    match param.declared_type {
        ParamType::String => Ok(ArgValue::String(raw.to_string())),
        ParamType::Raw => Ok(ArgValue::Raw(raw.to_string())),
        ParamType::Integer => raw.parse::<i64>().map(ArgValue::Integer).map_err(|_| failed()),
        ParamType::Float => match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(ArgValue::Float(n)),
            _ => Err(failed()),
        },
        ParamType::Boolean => {
            if raw.eq_ignore_ascii_case("true") || raw == "1" {
                Ok(ArgValue::Boolean(true))
            } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
                Ok(ArgValue::Boolean(false))
            } else {
                Err(failed())
            }
        }
    }
}

/// Bind raw request values to a command's parameters.
///
/// Name-keyed requests match by parameter name, positional requests by
/// parameter position. Values that match no parameter are ignored.
pub fn bind(descriptor: &CommandDescriptor, raw: &RawArgs) -> Result<BoundArgs, BindError> {
    let params = descriptor.parameters();
    let mut values = Vec::with_capacity(params.len());
    let mut first_error = None;

    for param in params {
        let raw_value = match raw {
            RawArgs::Named(map) => map.get(&param.name).map(String::as_str),
            RawArgs::Positional(list) => list.get(param.position).map(String::as_str),
        };

        let outcome = match raw_value {
            Some(value) => coerce(param, value),
            None => Err(BindError::MissingParameter(param.name.clone())),
        };

        match outcome {
            Ok(value) => values.push((param.name.clone(), value)),
            Err(err) => {
                debug!(
                    command_id = %descriptor.id(),
                    parameter = %param.name,
                    error = %err,
                    "Argument rejected"
                );
                first_error.get_or_insert(err);
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    let unmatched = match raw {
        RawArgs::Named(map) => {
            map.keys().filter(|k| !params.iter().any(|p| &p.name == *k)).count()
        }
        RawArgs::Positional(list) => list.len().saturating_sub(params.len()),
    };
    if unmatched > 0 {
        debug!(
            command_id = %descriptor.id(),
            unmatched,
            "Ignoring arguments that match no parameter"
        );
    }

    Ok(BoundArgs { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{CommandHost, CommandMarker, Operation, ParamMarker};
    use crate::scanner::scan;
    use std::sync::Arc;

    struct Sample;

    impl CommandHost for Sample {
        fn operations(&self) -> Vec<Operation<Self>> {
            vec![
                Operation::new("configure")
                    .command(CommandMarker::new("configure"))
                    .param(ParamMarker::integer("count"))
                    .param(ParamMarker::float("ratio"))
                    .param(ParamMarker::boolean("enabled"))
                    .param(ParamMarker::string("label"))
                    .handler(|_: &Self, args: &BoundArgs| Ok::<_, CommandFault>(args.to_json())),
            ]
        }
    }

    fn descriptor() -> CommandDescriptor {
        let host = Arc::new(Sample);
        let report = scan(&host);
        report.descriptors.into_iter().next().unwrap()
    }

    fn param(declared_type: ParamType) -> ParameterDescriptor {
        ParameterDescriptor {
            name: "p".to_string(),
            position: 0,
            declared_type,
            options: Vec::new(),
        }
    }

    #[test]
    fn test_integer_coercion_boundary() {
        let p = param(ParamType::Integer);
        assert_eq!(coerce(&p, "12").unwrap(), ArgValue::Integer(12));
        assert_eq!(coerce(&p, "-7").unwrap(), ArgValue::Integer(-7));
        assert!(matches!(coerce(&p, "abc"), Err(BindError::TypeCoercion { .. })));
        assert!(matches!(coerce(&p, ""), Err(BindError::TypeCoercion { .. })));
        assert!(matches!(coerce(&p, "3.5"), Err(BindError::TypeCoercion { .. })));
        assert!(matches!(coerce(&p, " 12"), Err(BindError::TypeCoercion { .. })));
    }

    #[test]
    fn test_float_coercion() {
        let p = param(ParamType::Float);
        assert_eq!(coerce(&p, "2.5").unwrap(), ArgValue::Float(2.5));
        assert_eq!(coerce(&p, "4").unwrap(), ArgValue::Float(4.0));
        assert!(coerce(&p, "NaN").is_err());
        assert!(coerce(&p, "inf").is_err());
        assert!(coerce(&p, "").is_err());
    }

    #[test]
    fn test_boolean_vocabulary() {
        let p = param(ParamType::Boolean);
        for raw in ["true", "TRUE", "True", "1"] {
            assert_eq!(coerce(&p, raw).unwrap(), ArgValue::Boolean(true), "{raw}");
        }
        for raw in ["false", "FaLsE", "0"] {
            assert_eq!(coerce(&p, raw).unwrap(), ArgValue::Boolean(false), "{raw}");
        }
        for raw in ["yes", "no", "", "2"] {
            assert!(coerce(&p, raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_string_and_raw_pass_through() {
        assert_eq!(coerce(&param(ParamType::String), "").unwrap(), ArgValue::String(String::new()));
        assert_eq!(
            coerce(&param(ParamType::Raw), "{\"a\":1}").unwrap(),
            ArgValue::Raw("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_bind_named() {
        let raw = RawArgs::named([
            ("count", "3"),
            ("ratio", "0.5"),
            ("enabled", "true"),
            ("label", "hi"),
            ("extra", "ignored"),
        ]);
        let args = bind(&descriptor(), &raw).unwrap();

        assert_eq!(args.len(), 4);
        assert_eq!(args.integer("count").unwrap(), 3);
        assert_eq!(args.float("ratio").unwrap(), 0.5);
        assert!(args.boolean("enabled").unwrap());
        assert_eq!(args.string("label").unwrap(), "hi");
        assert!(args.get("extra").is_none());
    }

    #[test]
    fn test_bind_positional() {
        let raw = RawArgs::positional(["3", "0.5", "0", "hi"]);
        let args = bind(&descriptor(), &raw).unwrap();
        assert_eq!(args.at(0), Some(&ArgValue::Integer(3)));
        assert_eq!(args.at(2), Some(&ArgValue::Boolean(false)));
        assert_eq!(args.at(3), Some(&ArgValue::String("hi".to_string())));
    }

    #[test]
    fn test_bind_reports_first_failure_in_parameter_order() {
        // ratio (position 1) is bad, label (position 3) is missing
        let raw = RawArgs::named([("count", "3"), ("ratio", "x"), ("enabled", "true")]);
        let err = bind(&descriptor(), &raw).unwrap_err();
        assert_eq!(
            err,
            BindError::TypeCoercion {
                name: "ratio".to_string(),
                expected: ParamType::Float,
                value: "x".to_string(),
            }
        );

        let raw = RawArgs::positional(["3"]);
        let err = bind(&descriptor(), &raw).unwrap_err();
        assert_eq!(err, BindError::MissingParameter("ratio".to_string()));
    }

    #[test]
    fn test_bind_is_idempotent() {
        let descriptor = descriptor();
        let raw =
            RawArgs::named([("count", "1"), ("ratio", "1.5"), ("enabled", "1"), ("label", "a")]);
        assert_eq!(bind(&descriptor, &raw).unwrap(), bind(&descriptor, &raw).unwrap());
    }

    #[test]
    fn test_accessor_type_mismatch_is_invalid_state() {
        let args = BoundArgs::from_values(vec![("n".to_string(), ArgValue::Integer(1))]);
        assert!(matches!(args.string("n"), Err(CommandFault::InvalidState(_))));
        assert!(matches!(args.integer("missing"), Err(CommandFault::InvalidState(_))));
    }

    #[test]
    fn test_to_json() {
        let args = BoundArgs::from_values(vec![
            ("x".to_string(), ArgValue::Integer(6)),
            ("ok".to_string(), ArgValue::Boolean(true)),
        ]);
        assert_eq!(args.to_json(), serde_json::json!({"x": 6, "ok": true}));
    }
}
