//! Statically declared parameter schemas.

use std::fmt;

use serde_json::Value;

use crate::validator::Violation;

/// Type descriptor of a declared parameter.
///
/// Checks are strict: no value is converted to fit. An integer parameter
/// rejects `"5"`, `5.0` and `true`; a string parameter rejects `5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Anything, for parameters without a declared type.
    Any,
    /// `true` or `false`.
    Bool,
    /// A whole number.
    Int,
    /// Text.
    Str,
    /// The inner type or nil.
    Optional(Box<ParamType>),
    /// An array whose elements all match the inner type.
    List(Box<ParamType>),
    /// A struct whose keys and values match the given types.
    Mapping(Box<ParamType>, Box<ParamType>),
    /// Any one of the member types.
    Union(Vec<ParamType>),
}

impl ParamType {
    /// `inner` or nil.
    pub fn optional(inner: Self) -> Self {
        Self::Optional(Box::new(inner))
    }

    /// Array of `inner`.
    pub fn list(inner: Self) -> Self {
        Self::List(Box::new(inner))
    }

    /// Struct from `key` to `value`.
    pub fn mapping(key: Self, value: Self) -> Self {
        Self::Mapping(Box::new(key), Box::new(value))
    }

    /// One of `members`.
    pub fn union(members: impl IntoIterator<Item = Self>) -> Self {
        Self::Union(members.into_iter().collect())
    }

    /// Whether `value` conforms.
    pub fn accepts(&self, value: &Value) -> bool {
        let mut violations = Vec::new();
        self.check(value, "", &mut violations);
        violations.is_empty()
    }

    /// Check `value` found at `path`, appending every violation to `out`.
    pub(crate) fn check(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        match self {
            Self::Any => {}
            Self::Bool => {
                if !value.is_boolean() {
                    out.push(Violation::new(path, "input should be a valid boolean"));
                }
            }
            Self::Int => {
                if !value.is_i64() {
                    out.push(Violation::new(path, "input should be a valid integer"));
                }
            }
            Self::Str => {
                if !value.is_string() {
                    out.push(Violation::new(path, "input should be a valid string"));
                }
            }
            Self::Optional(inner) => {
                if !value.is_null() {
                    inner.check(value, path, out);
                }
            }
            Self::List(inner) => match value.as_array() {
                Some(items) => {
                    for (index, item) in items.iter().enumerate() {
                        inner.check(item, &join(path, &index.to_string()), out);
                    }
                }
                None => out.push(Violation::new(path, "input should be a valid list")),
            },
            Self::Mapping(key_type, value_type) => match value.as_object() {
                Some(entries) => {
                    for (key, item) in entries {
                        let item_path = join(path, key);
                        key_type.check(
                            &Value::String(key.clone()),
                            &join(&item_path, "[key]"),
                            out,
                        );
                        value_type.check(item, &item_path, out);
                    }
                }
                None => out.push(Violation::new(path, "input should be a valid dictionary")),
            },
            Self::Union(members) => {
                if !members.iter().any(|member| member.accepts(value)) {
                    out.push(Violation::new(path, format!("input should be {self}")));
                }
            }
        }
    }
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Str => write!(f, "str"),
            Self::Optional(inner) => write!(f, "{inner} | None"),
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Mapping(key, value) => write!(f, "mapping[{key}, {value}]"),
            Self::Union(members) => {
                for (index, member) in members.iter().enumerate() {
                    if index > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    ty: ParamType,
    default: Option<Value>,
}

impl Param {
    /// Parameter name, also accepted as a keyword.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub const fn ty(&self) -> &ParamType {
        &self.ty
    }

    /// Default used when the argument is omitted; `None` means required.
    pub const fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether the argument must be supplied.
    pub const fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Ordered parameter declarations of a method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    params: Vec<Param>,
    unchecked: bool,
}

impl ParameterSchema {
    /// A schema taking no arguments.
    #[must_use]
    pub const fn new() -> Self {
        Self { params: Vec::new(), unchecked: false }
    }

    /// A schema that accepts any arguments and binds none, for methods that
    /// answer the same way whatever they are called with.
    #[must_use]
    pub const fn unchecked() -> Self {
        Self { params: Vec::new(), unchecked: true }
    }

    /// Append a required parameter.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(Param { name: name.into(), ty, default: None });
        self
    }

    /// Append an optional parameter with its default.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, ty: ParamType, default: Value) -> Self {
        self.params.push(Param { name: name.into(), ty, default: Some(default) });
        self
    }

    /// Declared parameters in order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Position of the parameter called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|param| param.name == name)
    }

    /// Whether arguments are accepted without checks.
    pub const fn is_unchecked(&self) -> bool {
        self.unchecked
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameter is declared.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
