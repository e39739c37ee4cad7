//! Binding and strict validation of call arguments.

use derive_more::Display;
use rpcgate_types::{ErrorKind, Fault, Params};
use serde_json::Value;

use crate::schema::ParameterSchema;

/// A single failed check, rendered `<path>: <reason>`.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{path}: {reason}")]
pub struct Violation {
    /// Dotted path of the offending argument.
    pub path: String,
    /// What is wrong with it.
    pub reason: String,
}

impl Violation {
    /// Create a violation.
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { path: path.into(), reason: reason.into() }
    }
}

/// Arguments bound to their declared parameters, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: Vec<(String, Value)>,
}

impl BoundArgs {
    /// Value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(param, _)| param == name).map(|(_, value)| value)
    }

    /// Value bound to the parameter at `index`.
    pub fn nth(&self, index: usize) -> Option<&Value> {
        self.values.get(index).map(|(_, value)| value)
    }

    /// String argument `name`.
    pub fn str(&self, name: &str) -> Result<&str, Fault> {
        self.get(name).and_then(Value::as_str).ok_or_else(|| mistyped(name, "a string"))
    }

    /// Boolean argument `name`.
    pub fn bool(&self, name: &str) -> Result<bool, Fault> {
        self.get(name).and_then(Value::as_bool).ok_or_else(|| mistyped(name, "a boolean"))
    }

    /// Integer argument `name`.
    pub fn int(&self, name: &str) -> Result<i64, Fault> {
        self.get(name).and_then(Value::as_i64).ok_or_else(|| mistyped(name, "an integer"))
    }

    /// Optional integer argument `name`; nil maps to `None`.
    pub fn opt_int(&self, name: &str) -> Result<Option<i64>, Fault> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| mistyped(name, "an integer")),
        }
    }

    /// List-of-strings argument `name`.
    pub fn str_list(&self, name: &str) -> Result<Vec<&str>, Fault> {
        self.get(name)
            .and_then(Value::as_array)
            .and_then(|items| items.iter().map(Value::as_str).collect::<Option<Vec<_>>>())
            .ok_or_else(|| mistyped(name, "a list of strings"))
    }

    /// Iterate `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A handler asked for an argument its schema does not declare with that type.
fn mistyped(name: &str, expected: &str) -> Fault {
    Fault::wrapped(ErrorKind::Value, format!("argument '{name}' is not {expected}"))
}

/// Bind `params` to `schema` and check every bound value.
///
/// Positional arguments bind in declared order, keyword arguments then bind by
/// name and replace a positional binding of the same parameter. Defaults fill
/// omitted optional parameters. Every problem found is reported in a single
/// [`Fault::InvalidParams`], joined with `"; "`.
pub fn validate(schema: &ParameterSchema, params: &Params) -> Result<BoundArgs, Fault> {
    if schema.is_unchecked() {
        return Ok(BoundArgs::default());
    }

    let declared = schema.params();
    let mut slots: Vec<Option<&Value>> = vec![None; declared.len()];
    let mut violations = Vec::new();

    for (index, value) in params.positional.iter().enumerate() {
        match slots.get_mut(index) {
            Some(slot) => *slot = Some(value),
            None => {
                violations.push(Violation::new(index.to_string(), "unexpected positional argument"))
            }
        }
    }

    for (name, value) in &params.keyword {
        match schema.position(name) {
            Some(index) => slots[index] = Some(value),
            None => violations.push(Violation::new(name.as_str(), "unexpected keyword argument")),
        }
    }

    let mut values = Vec::with_capacity(declared.len());
    for (param, slot) in declared.iter().zip(slots) {
        match (slot, param.default()) {
            (Some(value), _) => {
                param.ty().check(value, param.name(), &mut violations);
                values.push((param.name().to_string(), value.clone()));
            }
            (None, Some(default)) => values.push((param.name().to_string(), default.clone())),
            (None, None) => violations.push(Violation::new(param.name(), "missing required argument")),
        }
    }

    if violations.is_empty() {
        return Ok(BoundArgs { values });
    }

    let message = violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
    Err(Fault::InvalidParams(message))
}
