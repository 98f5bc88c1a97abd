//! # Helper Validators
//!
//! Type-membership checks for loosely typed fields, usable inside serde
//! `deserialize_with` hooks: a failure is a [`ValueError`], which serde
//! re-wraps with `D::Error::custom` and the binding reports as a value
//! error like any other.
//!
//! Works over `serde_json::Value` and `toml_edit::Value` through [`Typed`].
//! Each check returns its input unchanged on success; nothing is coerced.

use std::fmt;

use serde_json::Value as Json;
use thiserror::Error;
use toml_edit::Value;

/// The type of a TOML (or JSON) value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Basic or literal string.
    String,
    /// 64-bit signed integer.
    Integer,
    /// Finite or special float.
    Float,
    /// `true` or `false`.
    Boolean,
    /// Offset or local date-time, date, or time.
    Datetime,
    /// Inline array (or JSON array).
    Array,
    /// Table or inline table (or JSON object).
    Table,
    /// JSON `null`; TOML has no such value.
    Null,
}

impl ValueType {
    /// Lowercase TOML name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Array => "array",
            Self::Table => "table",
            Self::Null => "null",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value whose type can be inspected.
pub trait Typed {
    /// The value's type.
    fn value_type(&self) -> ValueType;

    /// The members of an array or the values of a table; `None` for
    /// anything else.
    fn elements(&self) -> Option<Vec<&Self>>;

    /// Compact rendering for messages.
    fn render(&self) -> String;
}

impl Typed for Json {
    fn value_type(&self) -> ValueType {
        match self {
            Json::Null => ValueType::Null,
            Json::Bool(_) => ValueType::Boolean,
            Json::Number(n) if n.is_i64() || n.is_u64() => ValueType::Integer,
            Json::Number(_) => ValueType::Float,
            Json::String(_) => ValueType::String,
            Json::Array(_) => ValueType::Array,
            Json::Object(_) => ValueType::Table,
        }
    }

    fn elements(&self) -> Option<Vec<&Self>> {
        match self {
            Json::Array(items) => Some(items.iter().collect()),
            Json::Object(map) => Some(map.values().collect()),
            _ => None,
        }
    }

    fn render(&self) -> String {
        self.to_string()
    }
}

impl Typed for Value {
    fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Datetime(_) => ValueType::Datetime,
            Value::Array(_) => ValueType::Array,
            Value::InlineTable(_) => ValueType::Table,
        }
    }

    fn elements(&self) -> Option<Vec<&Self>> {
        match self {
            Value::Array(array) => Some(array.iter().collect()),
            Value::InlineTable(table) => Some(table.iter().map(|(_, value)| value).collect()),
            _ => None,
        }
    }

    fn render(&self) -> String {
        self.to_string().trim().to_string()
    }
}

/// A value of the wrong type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// The list of accepted types is empty.
    #[error("expected a non-empty list of types")]
    NoTypes,

    /// A collection check got a scalar.
    #[error("value must be a collection (array or table), got '{found}'")]
    NotACollection {
        /// Type of the value.
        found: ValueType,
    },

    /// The value is not of the one accepted type.
    #[error("value of type '{found}' must be a '{expected}'")]
    Mismatch {
        /// Type of the value.
        found: ValueType,
        /// The accepted type.
        expected: ValueType,
    },

    /// The value is none of the accepted types.
    #[error("value of type '{found}' must be of one of types ({})", type_list(.expected))]
    NoneOf {
        /// Type of the value.
        found: ValueType,
        /// The accepted types.
        expected: Vec<ValueType>,
    },

    /// A collection element has the wrong type.
    #[error(
        "value {index} ('{value}') in collection of type '{found}' must be {}",
        expected_clause(.expected)
    )]
    Element {
        /// 1-based position of the element.
        index: usize,
        /// The element, rendered.
        value: String,
        /// Type of the element.
        found: ValueType,
        /// The accepted types.
        expected: Vec<ValueType>,
    },
}

fn type_list(types: &[ValueType]) -> String {
    types
        .iter()
        .map(|t| format!("'{t}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn expected_clause(types: &[ValueType]) -> String {
    match types {
        [only] => format!("of type '{only}'"),
        _ => format!("one of types ({})", type_list(types)),
    }
}

/// `value` if it is of type `ty`.
pub fn validate_to_specific_type<V: Typed>(value: &V, ty: ValueType) -> Result<&V, ValueError> {
    let found = value.value_type();
    if found == ty {
        Ok(value)
    } else {
        Err(ValueError::Mismatch { found, expected: ty })
    }
}

/// `value` if it is of any type in `types`.
pub fn validate_to_multiple_types<'v, V: Typed>(
    value: &'v V,
    types: &[ValueType],
) -> Result<&'v V, ValueError> {
    if types.is_empty() {
        return Err(ValueError::NoTypes);
    }
    let found = value.value_type();
    if types.contains(&found) {
        Ok(value)
    } else {
        Err(ValueError::NoneOf {
            found,
            expected: types.to_vec(),
        })
    }
}

/// `value` if it is a collection whose elements are all of type `ty`.
pub fn validate_homogeneous_collection<V: Typed>(
    value: &V,
    ty: ValueType,
) -> Result<&V, ValueError> {
    check_elements(value, &[ty])
}

/// `value` if it is a collection whose elements are each of some type in
/// `types`.
pub fn validate_heterogeneous_collection<'v, V: Typed>(
    value: &'v V,
    types: &[ValueType],
) -> Result<&'v V, ValueError> {
    if types.is_empty() {
        return Err(ValueError::NoTypes);
    }
    check_elements(value, types)
}

fn check_elements<'v, V: Typed>(value: &'v V, types: &[ValueType]) -> Result<&'v V, ValueError> {
    let elements = value.elements().ok_or(ValueError::NotACollection {
        found: value.value_type(),
    })?;
    for (index, element) in elements.into_iter().enumerate() {
        let found = element.value_type();
        if !types.contains(&found) {
            return Err(ValueError::Element {
                index: index + 1,
                value: element.render(),
                found,
                expected: types.to_vec(),
            });
        }
    }
    Ok(value)
}
